pub mod activity;
pub mod aggregate;
pub mod cli;
pub mod error;
pub mod fetch;
pub mod kube;
pub mod model;
pub mod parsers;
pub mod reconcile;
pub mod report;
pub mod watch;

//! Command handler functions for the spotwatch CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::aggregate::aggregate;
use crate::fetch::{FetchConfig, HttpFetcher, ReportSource};
use crate::model::BugCollection;
use crate::parsers::spotbugs::SpotBugsParser;
use crate::parsers::Parser;
use crate::reconcile::build_fact;
use crate::report::{MarkdownFormatter, SummaryFormatter, SummaryReport, TextFormatter};
use crate::watch::{ActivityStore, WatchConfig, WatchSource, Watcher};

/// Output style for the `summarize` command.
#[derive(Clone, Copy, ValueEnum)]
pub enum Style {
    Text,
    Markdown,
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Load a report from a local path or an http(s) URL.
pub fn load_report(location: &str, fetch: &FetchConfig) -> Result<BugCollection> {
    if is_url(location) {
        let fetcher = HttpFetcher::new(fetch.clone());
        return fetcher
            .fetch(location)
            .with_context(|| format!("Unable to retrieve {} for processing", location));
    }
    let content = std::fs::read(Path::new(location))
        .with_context(|| format!("Failed to read {}", location))?;
    SpotBugsParser
        .parse(&content)
        .with_context(|| format!("Failed to parse {}", location))
}

pub fn cmd_summarize(location: &str, style: Style, fetch: &FetchConfig) -> Result<String> {
    let collection = load_report(location, fetch)?;
    let summary = aggregate(&collection);
    let report = SummaryReport::new(location, &collection, summary);
    let formatter: &dyn SummaryFormatter = match style {
        Style::Text => &TextFormatter,
        Style::Markdown => &MarkdownFormatter,
    };
    Ok(report.format(formatter))
}

/// Print the fact that the watcher would write for this report.
pub fn cmd_fact(location: &str, fetch: &FetchConfig) -> Result<String> {
    let collection = load_report(location, fetch)?;
    let fact = build_fact(location, &aggregate(&collection));
    let mut out = serde_json::to_string_pretty(&fact).context("Failed to encode fact")?;
    out.push('\n');
    Ok(out)
}

/// Run the watch loop until the event stream closes.
pub fn cmd_watch<C>(client: &C, fetch: &FetchConfig, config: WatchConfig) -> Result<String>
where
    C: WatchSource + ActivityStore,
{
    let events = client.watch().context("Failed to open watch")?;
    let mut watcher = Watcher::new(HttpFetcher::new(fetch.clone()), client, config);
    let stats = watcher.run(events).context("Watch stream failed")?;
    Ok(format!(
        "Watch closed: {} events, {} reports, {} updates, {} unchanged, {} failures\n",
        stats.events, stats.urls, stats.updates, stats.unchanged, stats.failures
    ))
}

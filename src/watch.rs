//! The watch loop: activity events in, fact updates out.
//!
//! Events are handled strictly one at a time. For every report URL attached
//! to an added or modified activity the loop fetches the report, aggregates
//! it, reconciles the summary into a private copy of the activity and, if
//! that changed anything, writes the copy back. Failures are logged per URL
//! and never stop the loop; only the end of the event stream does.

use tracing::{debug, error, info, warn};

use crate::activity::PipelineActivity;
use crate::aggregate::aggregate;
use crate::error::{Result, SpotwatchError};
use crate::fetch::ReportSource;
use crate::reconcile::{reconcile, FACT_TYPE_STATIC_PROGRAM_ANALYSIS};

/// A change notification for one activity, carrying a full snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(PipelineActivity),
    Modified(PipelineActivity),
    Deleted(PipelineActivity),
}

/// Persists activities with optimistic concurrency.
pub trait ActivityStore {
    /// Replace the stored activity, returning the stored version. A stale
    /// `resourceVersion` fails with `SpotwatchError::Conflict`.
    fn update(&self, activity: &PipelineActivity) -> Result<PipelineActivity>;
}

impl<T: ActivityStore + ?Sized> ActivityStore for &T {
    fn update(&self, activity: &PipelineActivity) -> Result<PipelineActivity> {
        (**self).update(activity)
    }
}

/// Produces the stream of activity events for one namespace.
pub trait WatchSource {
    fn watch(&self) -> Result<Box<dyn Iterator<Item = Result<WatchEvent>> + '_>>;
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Attachment name that holds report URLs.
    pub attachment_name: String,
    /// Leave activities that already carry a static-analysis fact alone.
    pub skip_summarized: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            attachment_name: "spotbugs".to_string(),
            skip_summarized: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Processing,
}

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Added/modified events handled.
    pub events: u64,
    /// Deleted events and activities with nothing to do.
    pub skipped_events: u64,
    /// Report URLs run through the pipeline.
    pub urls: u64,
    pub updates: u64,
    pub unchanged: u64,
    pub failures: u64,
}

pub struct Watcher<R, S> {
    reports: R,
    store: S,
    config: WatchConfig,
    state: State,
    stats: RunStats,
}

impl<R: ReportSource, S: ActivityStore> Watcher<R, S> {
    pub fn new(reports: R, store: S, config: WatchConfig) -> Self {
        Self {
            reports,
            store,
            config,
            state: State::Idle,
            stats: RunStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Drain `events` until the stream ends. An error item from the stream
    /// ends the run and is returned.
    pub fn run<I>(&mut self, events: I) -> Result<RunStats>
    where
        I: IntoIterator<Item = Result<WatchEvent>>,
    {
        for event in events {
            self.handle_event(event?);
        }
        info!(
            events = self.stats.events,
            updates = self.stats.updates,
            failures = self.stats.failures,
            "watch stream closed"
        );
        Ok(self.stats)
    }

    pub fn handle_event(&mut self, event: WatchEvent) {
        let activity = match event {
            WatchEvent::Added(activity) | WatchEvent::Modified(activity) => activity,
            WatchEvent::Deleted(activity) => {
                debug!(activity = activity.name(), "ignoring deleted activity");
                self.stats.skipped_events += 1;
                return;
            }
        };

        let urls: Vec<String> = activity
            .attachment_urls(&self.config.attachment_name)
            .map(str::to_string)
            .collect();
        if urls.is_empty() {
            self.stats.skipped_events += 1;
            return;
        }
        if self.config.skip_summarized
            && activity.count_facts(FACT_TYPE_STATIC_PROGRAM_ANALYSIS) > 0
        {
            debug!(activity = activity.name(), "already summarized, skipping");
            self.stats.skipped_events += 1;
            return;
        }

        self.state = State::Processing;
        self.stats.events += 1;

        let mut snapshot = activity;
        for url in &urls {
            self.stats.urls += 1;
            match self.process_url(&snapshot, url) {
                Ok(Some(stored)) => {
                    self.stats.updates += 1;
                    snapshot = stored;
                }
                Ok(None) => self.stats.unchanged += 1,
                Err(e) => {
                    self.stats.failures += 1;
                    log_failure(snapshot.name(), url, &e);
                    // The snapshot is stale; later URLs would conflict too.
                    // The next event for this activity retries them all.
                    if matches!(e, SpotwatchError::Conflict { .. }) {
                        break;
                    }
                }
            }
        }

        self.state = State::Idle;
    }

    /// Run one report URL through fetch, aggregate, reconcile and update.
    ///
    /// Returns the stored activity when an update was written, `None` when
    /// the activity already held identical content.
    pub fn process_url(
        &self,
        snapshot: &PipelineActivity,
        url: &str,
    ) -> Result<Option<PipelineActivity>> {
        let collection = self.reports.fetch(url)?;
        let summary = aggregate(&collection);

        let mut working = snapshot.clone();
        let outcome = reconcile(&mut working, url, &summary)?;
        if !outcome.is_modified() {
            debug!(activity = working.name(), url, "fact already up to date");
            return Ok(None);
        }

        let stored = self.store.update(&working)?;
        info!(
            activity = stored.name(),
            url,
            outcome = ?outcome,
            "Updated PipelineActivity with data from report"
        );
        Ok(Some(stored))
    }
}

fn log_failure(activity: &str, url: &str, err: &SpotwatchError) {
    match err {
        SpotwatchError::DuplicateFact { .. } => {
            error!(activity, url, kind = err.kind(), "{}", err);
        }
        SpotwatchError::Conflict { .. } => {
            warn!(activity, url, kind = err.kind(), "update lost a race, dropping: {}", err);
        }
        _ => {
            warn!(activity, url, kind = err.kind(), "unable to process report: {}", err);
        }
    }
}

//! Merges a report summary into the fact list of an activity record.
//!
//! A record carries at most one static-analysis fact. Reconciling appends it
//! when missing and replaces it in place when present, so running the same
//! report through twice yields the same record. Two or more such facts mean
//! something already went wrong; that is reported and left alone.

use crate::activity::{Fact, Measurement, Original, PipelineActivity};
use crate::error::{Result, SpotwatchError};
use crate::model::{Bucket, Summary};

pub const FACT_TYPE_STATIC_PROGRAM_ANALYSIS: &str = "jx.staticProgramAnalysis";
pub const MEASUREMENT_COUNT: &str = "count";
pub const REPORT_MIME_TYPE: &str = "application/xml";
pub const REPORT_TAG: &str = "spotbugsXml.xml";
pub const TOOL_TAG: &str = "spotbugs";

/// What `reconcile` did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Appended,
    Replaced,
    /// The existing fact already had identical content.
    Unchanged,
}

impl Reconciled {
    /// Whether the record differs from before and needs to be persisted.
    #[must_use]
    pub fn is_modified(self) -> bool {
        !matches!(self, Reconciled::Unchanged)
    }
}

/// Build the static-analysis fact for a summary of the report at `source_url`.
#[must_use]
pub fn build_fact(source_url: &str, summary: &Summary) -> Fact {
    let mut measurements = Vec::with_capacity(summary.categories.len() * 4 + 6);
    for (category, tally) in &summary.categories {
        for bucket in Bucket::ALL {
            measurements.push(count_measurement(category, bucket.as_str(), tally.get(bucket)));
        }
    }
    for (metric, value) in summary.totals.metrics() {
        measurements.push(count_measurement("summary", metric, value));
    }

    Fact {
        fact_type: FACT_TYPE_STATIC_PROGRAM_ANALYSIS.to_string(),
        original: Original {
            url: source_url.to_string(),
            mimetype: REPORT_MIME_TYPE.to_string(),
            tags: vec![REPORT_TAG.to_string()],
        },
        tags: vec![TOOL_TAG.to_string()],
        measurements,
        ..Default::default()
    }
}

fn count_measurement(prefix: &str, metric: &str, value: u64) -> Measurement {
    Measurement {
        name: format!("{}-{}", prefix, metric),
        measurement_type: MEASUREMENT_COUNT.to_string(),
        measurement_value: value,
        tags: Vec::new(),
    }
}

/// Write the fact for `summary` into `activity`.
///
/// On `DuplicateFact` the record is left untouched.
pub fn reconcile(
    activity: &mut PipelineActivity,
    source_url: &str,
    summary: &Summary,
) -> Result<Reconciled> {
    let candidate = build_fact(source_url, summary);

    let matches: Vec<usize> = activity
        .spec
        .facts
        .iter()
        .enumerate()
        .filter(|(_, f)| f.fact_type == FACT_TYPE_STATIC_PROGRAM_ANALYSIS)
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [] => {
            activity.spec.facts.push(candidate);
            Ok(Reconciled::Appended)
        }
        [index] => {
            let existing = &mut activity.spec.facts[*index];
            if *existing == candidate {
                Ok(Reconciled::Unchanged)
            } else {
                *existing = candidate;
                Ok(Reconciled::Replaced)
            }
        }
        found => Err(SpotwatchError::DuplicateFact {
            kind: FACT_TYPE_STATIC_PROGRAM_ANALYSIS.to_string(),
            found: found.len(),
        }),
    }
}

//! Turns a decoded report into a `Summary`.
//!
//! Category breakdowns are always counted from the bug instances. Report-wide
//! totals are copied from the `<FindBugsSummary>` block when the report has
//! one, so the numbers match what the analysis tool itself printed even when
//! the instance list is truncated.

use crate::model::{Bucket, BugCollection, FindBugsSummary, Summary, Totals};

/// Aggregate a report into per-category tallies plus global totals.
#[must_use]
pub fn aggregate(collection: &BugCollection) -> Summary {
    let mut summary = Summary::default();

    for bug in &collection.bug_instances {
        // Unmapped priorities (4, 0, ...) count towards no category.
        if let Some(bucket) = Bucket::from_priority(bug.priority) {
            summary
                .categories
                .entry(bug.category.clone())
                .or_default()
                .increment(bucket);
        }
    }

    summary.totals = match &collection.summary {
        Some(reported) => reported_totals(reported),
        None => counted_totals(collection),
    };

    summary
}

fn reported_totals(reported: &FindBugsSummary) -> Totals {
    Totals {
        total_bugs: reported.total_bugs,
        high_priority: reported.priority_1,
        normal_priority: reported.priority_2,
        low_priority: reported.priority_3,
        ignored: reported.priority_5,
        total_classes: reported.total_classes,
    }
}

/// Fallback for reports without a summary block.
fn counted_totals(collection: &BugCollection) -> Totals {
    let mut totals = Totals {
        total_bugs: collection.bug_instances.len() as u64,
        ..Default::default()
    };
    for bug in &collection.bug_instances {
        match Bucket::from_priority(bug.priority) {
            Some(Bucket::High) => totals.high_priority += 1,
            Some(Bucket::Normal) => totals.normal_priority += 1,
            Some(Bucket::Low) => totals.low_priority += 1,
            Some(Bucket::Ignored) => totals.ignored += 1,
            None => {}
        }
    }
    totals
}

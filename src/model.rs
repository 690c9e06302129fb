//! In-memory representation of a SpotBugs/FindBugs XML report and of the
//! summary derived from it. Parsers produce a `BugCollection`, the aggregator
//! turns it into a `Summary`.

use std::collections::BTreeMap;

/// Primary source location of a bug instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLine {
    pub source_path: Option<String>,
    pub start: Option<u32>,
    pub end: Option<u32>,
}

/// A single reported finding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugInstance {
    pub category: String,
    /// Raw priority code from the report. Only 1, 2, 3 and 5 are meaningful;
    /// other values, negative ones included, are kept but not bucketed.
    pub priority: i64,
    pub bug_type: Option<String>,
    pub abbrev: Option<String>,
    pub rank: Option<u32>,
    pub instance_hash: Option<String>,
    pub short_message: Option<String>,
    pub long_message: Option<String>,
    pub class_name: Option<String>,
    pub source_line: Option<SourceLine>,
}

impl BugInstance {
    pub fn new(category: impl Into<String>, priority: i64) -> Self {
        Self {
            category: category.into(),
            priority,
            ..Default::default()
        }
    }
}

/// The `<FindBugsSummary>` block: totals as computed by the analysis tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindBugsSummary {
    pub total_bugs: u64,
    pub total_classes: u64,
    pub priority_1: u64,
    pub priority_2: u64,
    pub priority_3: u64,
    /// Reserved ("experimental") priority; carried but never reported.
    pub priority_4: u64,
    pub priority_5: u64,
    pub num_packages: u64,
    pub total_size: u64,
    pub referenced_classes: u64,
}

/// The complete result of parsing a single report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugCollection {
    pub version: Option<String>,
    pub release: Option<String>,
    pub sequence: Option<u64>,
    pub timestamp: Option<String>,
    pub project_name: Option<String>,
    pub summary: Option<FindBugsSummary>,
    pub bug_instances: Vec<BugInstance>,
}

impl BugCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Priority class a bug instance is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    High,
    Normal,
    Low,
    Ignored,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::High, Bucket::Normal, Bucket::Low, Bucket::Ignored];

    /// Map a report priority code to its bucket. Code 4 and anything outside
    /// 1..=5 have no bucket.
    #[must_use]
    pub fn from_priority(priority: i64) -> Option<Self> {
        match priority {
            1 => Some(Bucket::High),
            2 => Some(Bucket::Normal),
            3 => Some(Bucket::Low),
            5 => Some(Bucket::Ignored),
            _ => None,
        }
    }

    /// Name used in measurement keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::High => "high",
            Bucket::Normal => "normal",
            Bucket::Low => "low",
            Bucket::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category counts, one counter per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryTally {
    pub high: u64,
    pub normal: u64,
    pub low: u64,
    pub ignored: u64,
}

impl CategoryTally {
    #[must_use]
    pub fn get(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::High => self.high,
            Bucket::Normal => self.normal,
            Bucket::Low => self.low,
            Bucket::Ignored => self.ignored,
        }
    }

    pub fn increment(&mut self, bucket: Bucket) {
        let slot = match bucket {
            Bucket::High => &mut self.high,
            Bucket::Normal => &mut self.normal,
            Bucket::Low => &mut self.low,
            Bucket::Ignored => &mut self.ignored,
        };
        *slot += 1;
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.high + self.normal + self.low + self.ignored
    }
}

/// Report-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total_bugs: u64,
    pub high_priority: u64,
    pub normal_priority: u64,
    pub low_priority: u64,
    pub ignored: u64,
    pub total_classes: u64,
}

impl Totals {
    /// Totals as `(metric name, value)` pairs in a fixed order.
    #[must_use]
    pub fn metrics(&self) -> [(&'static str, u64); 6] {
        [
            ("bugs", self.total_bugs),
            ("high", self.high_priority),
            ("normal", self.normal_priority),
            ("low", self.low_priority),
            ("ignored", self.ignored),
            ("classes", self.total_classes),
        ]
    }
}

/// Aggregated view of one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub categories: BTreeMap<String, CategoryTally>,
    pub totals: Totals,
}

impl Summary {
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryTally> {
        self.categories.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_four_has_no_bucket() {
        assert_eq!(Bucket::from_priority(1), Some(Bucket::High));
        assert_eq!(Bucket::from_priority(5), Some(Bucket::Ignored));
        assert_eq!(Bucket::from_priority(4), None);
        assert_eq!(Bucket::from_priority(0), None);
        assert_eq!(Bucket::from_priority(-1), None);
    }

    #[test]
    fn tally_increments_one_counter() {
        let mut tally = CategoryTally::default();
        tally.increment(Bucket::Low);
        tally.increment(Bucket::Low);
        assert_eq!(tally.get(Bucket::Low), 2);
        assert_eq!(tally.get(Bucket::High), 0);
        assert_eq!(tally.total(), 2);
    }
}

//! Output formatting for report summaries.

use std::fmt::Write;

use crate::model::{Bucket, BugCollection, Summary};

/// A summary together with where it came from, ready to be formatted.
pub struct SummaryReport {
    /// Path or URL the report was read from.
    pub source: String,
    pub project: Option<String>,
    pub tool_version: Option<String>,
    pub summary: Summary,
}

impl SummaryReport {
    pub fn new(source: &str, collection: &BugCollection, summary: Summary) -> Self {
        Self {
            source: source.to_string(),
            project: collection.project_name.clone(),
            tool_version: collection.version.clone(),
            summary,
        }
    }

    /// Format using a specific formatter.
    #[must_use]
    pub fn format(&self, formatter: &dyn SummaryFormatter) -> String {
        formatter.format(self)
    }
}

/// Trait for formatting summary reports.
pub trait SummaryFormatter {
    /// Format the report to a string.
    fn format(&self, report: &SummaryReport) -> String;
}

/// Plain text formatter.
pub struct TextFormatter;

impl SummaryFormatter for TextFormatter {
    fn format(&self, report: &SummaryReport) -> String {
        let mut out = String::new();
        let totals = &report.summary.totals;

        writeln!(out, "Report:     {}", report.source).unwrap();
        if let Some(ref project) = report.project {
            writeln!(out, "Project:    {}", project).unwrap();
        }
        if let Some(ref version) = report.tool_version {
            writeln!(out, "SpotBugs:   {}", version).unwrap();
        }
        writeln!(
            out,
            "Bugs:       {} (high {}, normal {}, low {}, ignored {})",
            totals.total_bugs,
            totals.high_priority,
            totals.normal_priority,
            totals.low_priority,
            totals.ignored
        )
        .unwrap();
        writeln!(out, "Classes:    {}", totals.total_classes).unwrap();

        if report.summary.categories.is_empty() {
            out.push_str("\nNo categorized bug instances.\n");
            return out;
        }

        out.push('\n');
        writeln!(
            out,
            "{:<30} {:>8} {:>8} {:>8} {:>8}",
            "CATEGORY", "HIGH", "NORMAL", "LOW", "IGNORED"
        )
        .unwrap();
        writeln!(out, "{}", "-".repeat(66)).unwrap();
        for (category, tally) in &report.summary.categories {
            write!(out, "{:<30}", category).unwrap();
            for bucket in Bucket::ALL {
                write!(out, " {:>8}", tally.get(bucket)).unwrap();
            }
            out.push('\n');
        }

        out
    }
}

/// Markdown formatter.
pub struct MarkdownFormatter;

impl SummaryFormatter for MarkdownFormatter {
    fn format(&self, report: &SummaryReport) -> String {
        let mut md = String::new();
        let totals = &report.summary.totals;

        match report.project {
            Some(ref project) => writeln!(md, "### SpotBugs: {project}\n").unwrap(),
            None => md.push_str("### SpotBugs\n\n"),
        }

        writeln!(
            md,
            "**{}** bugs in **{}** classes (high {}, normal {}, low {}, ignored {})",
            totals.total_bugs,
            totals.total_classes,
            totals.high_priority,
            totals.normal_priority,
            totals.low_priority,
            totals.ignored
        )
        .unwrap();

        if !report.summary.categories.is_empty() {
            md.push_str("\n| Category | High | Normal | Low | Ignored |\n");
            md.push_str("|:---------|-----:|-------:|----:|--------:|\n");
            for (category, tally) in &report.summary.categories {
                writeln!(
                    md,
                    "| `{category}` | {} | {} | {} | {} |",
                    tally.high, tally.normal, tally.low, tally.ignored
                )
                .unwrap();
            }
        }

        md.push('\n');
        writeln!(md, "<sub>Source: {}</sub>", report.source).unwrap();

        md
    }
}

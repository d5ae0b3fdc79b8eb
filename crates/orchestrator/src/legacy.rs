//! Plain reporter for issues retrieved by job reference
//!
//! Retrieved jobs skip the aggregator, so there is no success/failure split
//! to report on. Each report prints its source list followed by a YAML dump
//! of every issue, or a single `No issues found` line.

use crate::core::IssueReport;
use colored::Colorize;
use std::io::{self, Write};

pub const NO_ISSUES: &str = "No issues found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyLine {
    /// Source list of the report that follows.
    Heading(String),
    Issue(String),
    NoIssues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyReport {
    pub job_reference: String,
    pub lines: Vec<LegacyLine>,
    pub issue_count: usize,
}

impl LegacyReport {
    pub fn render(job_reference: impl Into<String>, reports: &[IssueReport]) -> Self {
        let issue_count = reports.iter().map(|r| r.issues.len()).sum();
        let mut lines = Vec::new();

        if issue_count == 0 {
            lines.push(LegacyLine::NoIssues);
        } else {
            for report in reports.iter().filter(|r| !r.issues.is_empty()) {
                lines.push(LegacyLine::Heading(report.source_list.join(", ")));
                for issue in &report.issues {
                    let dump = serde_yaml::to_string(issue).unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "could not dump issue as YAML");
                        format!("{}: {}\n", issue.swc_id, issue.description.head)
                    });
                    lines.push(LegacyLine::Issue(dump));
                }
            }
        }

        Self {
            job_reference: job_reference.into(),
            lines,
            issue_count,
        }
    }

    pub fn has_issues(&self) -> bool {
        self.issue_count > 0
    }

    pub fn write_to<W: Write>(&self, out: &mut W, color: bool) -> io::Result<()> {
        for line in &self.lines {
            match line {
                LegacyLine::Heading(sources) if color => writeln!(out, "{}", sources.underline())?,
                LegacyLine::Heading(sources) => writeln!(out, "{}", sources)?,
                LegacyLine::Issue(dump) => write!(out, "{}", dump)?,
                LegacyLine::NoIssues => writeln!(out, "{}", NO_ISSUES)?,
            }
        }
        Ok(())
    }

    pub fn to_plain_text(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut buf, false);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

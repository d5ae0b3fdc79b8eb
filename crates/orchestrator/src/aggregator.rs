use crate::core::{AnalysisOutcome, Failure, Finding, Severity, Success};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Partitions outcomes as they arrive, keeping arrival order in each half.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    successes: Vec<Success>,
    failures: Vec<Failure>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::Success(s) => self.successes.push(s),
            AnalysisOutcome::Failure(f) => self.failures.push(f),
        }
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finish(self) -> AggregatedResult {
        AggregatedResult {
            successes: self.successes,
            failures: self.failures,
            abandoned: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}

pub fn fold(outcomes: impl IntoIterator<Item = AnalysisOutcome>) -> AggregatedResult {
    let mut aggregator = ResultAggregator::new();
    for outcome in outcomes {
        aggregator.record(outcome);
    }
    aggregator.finish()
}

/// How the report layer should read a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No findings and every job completed.
    Clean,
    /// No findings, but some jobs failed or never finished.
    Inconclusive,
    FindingsReported,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Inconclusive => write!(f, "inconclusive"),
            Self::FindingsReported => write!(f, "findings reported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    pub successes: Vec<Success>,
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub abandoned: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl AggregatedResult {
    pub fn with_abandoned(mut self, abandoned: Vec<String>) -> Self {
        self.abandoned = abandoned;
        self
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn finding_count(&self) -> usize {
        self.successes.iter().map(|s| s.findings.len()).sum()
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.successes.iter().flat_map(|s| s.findings.iter())
    }

    pub fn has_service_logs(&self) -> bool {
        self.successes.iter().any(|s| !s.service_logs.is_empty())
    }

    pub fn is_partial(&self) -> bool {
        !self.abandoned.is_empty()
    }

    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for finding in self.findings() {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn verdict(&self) -> Verdict {
        if self.finding_count() > 0 {
            Verdict::FindingsReported
        } else if self.failures.is_empty() && self.abandoned.is_empty() {
            Verdict::Clean
        } else {
            Verdict::Inconclusive
        }
    }
}

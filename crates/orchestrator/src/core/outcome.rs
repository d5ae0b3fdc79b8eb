use crate::core::{Finding, JobError, ServiceLog};
use serde::Serialize;

/// A job that reached `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Success {
    #[serde(rename = "contractIdentity")]
    pub contract: String,
    pub findings: Vec<Finding>,
    pub service_logs: Vec<ServiceLog>,
}

/// A job that ended in `Error`, `TimedOut`, or a local failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    #[serde(rename = "contractIdentity")]
    pub contract: String,
    #[serde(serialize_with = "reason_text")]
    pub reason: JobError,
}

fn reason_text<S: serde::Serializer>(reason: &JobError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Exactly one per dispatched job, however many polls it took.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    Success(Success),
    Failure(Failure),
}

impl AnalysisOutcome {
    pub fn success(
        contract: impl Into<String>,
        findings: Vec<Finding>,
        service_logs: Vec<ServiceLog>,
    ) -> Self {
        Self::Success(Success {
            contract: contract.into(),
            findings,
            service_logs,
        })
    }

    pub fn failure(contract: impl Into<String>, reason: JobError) -> Self {
        Self::Failure(Failure {
            contract: contract.into(),
            reason,
        })
    }

    pub fn contract(&self) -> &str {
        match self {
            Self::Success(s) => &s.contract,
            Self::Failure(f) => &f.contract,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

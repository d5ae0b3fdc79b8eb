use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one analysis job.
///
/// `Submitted` and `Pending` are transient. `Finished`, `Error` and
/// `TimedOut` are terminal: once a job reaches one of them it is never
/// polled again. `TimedOut` is never reported by the service, only assigned
/// locally when the poll budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Submitted,
    #[serde(alias = "Queued", alias = "In progress", alias = "Running")]
    Pending,
    Finished,
    Error,
    #[serde(skip_deserializing)]
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::TimedOut)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "Submitted"),
            Self::Pending => write!(f, "Pending"),
            Self::Finished => write!(f, "Finished"),
            Self::Error => write!(f, "Error"),
            Self::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// A status payload as returned by submission or a status query.
///
/// Fields other than the job handle and the status are kept verbatim so a
/// failed job can hand the whole payload to the report as its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    pub status: JobStatus,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            uuid: None,
            status,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "status": self.status }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_status_aliases() {
        let queued: StatusReport = serde_json::from_value(json!({ "status": "Queued" })).unwrap();
        assert_eq!(queued.status, JobStatus::Pending);

        let running: StatusReport =
            serde_json::from_value(json!({ "uuid": "abc", "status": "In progress" })).unwrap();
        assert_eq!(running.status, JobStatus::Pending);
        assert_eq!(running.uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn test_timed_out_is_local_only() {
        assert!(serde_json::from_value::<StatusReport>(json!({ "status": "TimedOut" })).is_err());
        assert!(JobStatus::TimedOut.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let report: StatusReport = serde_json::from_value(json!({
            "uuid": "abc",
            "status": "Error",
            "error": "compilation failed"
        }))
        .unwrap();

        let json = report.to_json();
        assert_eq!(json["error"], "compilation failed");
        assert_eq!(json["status"], "Error");
    }
}

use thiserror::Error;

/// Invalid engine configuration. The only error that aborts a whole
/// invocation, and it is always raised before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("limit parameter should be a number; got {0}.")]
    LimitNotANumber(String),

    #[error("limit should be between 0 and {max}; got {value}.")]
    LimitOutOfRange { value: String, max: usize },
}

/// Failure of a single call on the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Why one job ended without a result. Recorded inside a failure outcome,
/// never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error("transport failure: {0}")]
    Transport(#[from] ClientError),

    #[error("service reported an error: {}", .status)]
    Service { status: serde_json::Value },

    #[error("gave up after {waited_secs}s of polling; last status: {}", .last_status)]
    Timeout {
        waited_secs: u64,
        last_status: serde_json::Value,
    },

    #[error("malformed service response: {0}")]
    MalformedResponse(String),

    #[error("analysis task terminated unexpectedly: {0}")]
    Aborted(String),
}

impl JobError {
    /// The status payload the service last reported, when there was one.
    pub fn last_status(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Service { status } => Some(status),
            Self::Timeout { last_status, .. } => Some(last_status),
            _ => None,
        }
    }
}

/// The caller could not be resolved to a usable account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("account lookup failed: {0}")]
    LookupFailed(#[from] ClientError),

    #[error("account lookup returned no users")]
    NoIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_limit_messages() {
        assert_eq!(
            ConfigurationError::LimitNotANumber("test".into()).to_string(),
            "limit parameter should be a number; got test."
        );
        assert_eq!(
            ConfigurationError::LimitOutOfRange {
                value: "45".into(),
                max: 40
            }
            .to_string(),
            "limit should be between 0 and 40; got 45."
        );
    }

    #[test]
    fn test_service_error_carries_status() {
        let err = JobError::Service {
            status: json!({ "status": "Error" }),
        };
        assert_eq!(err.last_status(), Some(&json!({ "status": "Error" })));
        assert!(err.to_string().contains("Error"));
    }
}

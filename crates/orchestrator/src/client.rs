//! Capabilities the engine needs from the remote analysis service
//!
//! The engine never talks HTTP itself. Submission, status queries, account
//! lookup and retrieval by job reference are reached through
//! [`AnalysisClient`], which is shared read-only by every concurrent job.

use crate::core::{AnalysisPayload, ClientError, StatusReport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One submission as sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub client_tool_name: String,

    pub data: AnalysisPayload,

    pub no_cache_lookup: bool,
}

impl AnalysisRequest {
    pub fn new(client_tool_name: impl Into<String>, data: AnalysisPayload) -> Self {
        Self {
            client_tool_name: client_tool_name.into(),
            data,
            no_cache_lookup: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// How long the service may hold the submission open.
    pub timeout: Duration,

    /// Poll interval the client should use internally, if it polls at all.
    pub poll_interval: Option<Duration>,
}

/// What the service answers to a submission.
///
/// `issues` is kept as raw JSON: whether it is a valid report list is
/// decided by the poller, not by deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub issues: serde_json::Value,

    pub status: StatusReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub total: usize,

    #[serde(default)]
    pub users: Vec<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,

    #[serde(default)]
    pub roles: Vec<String>,
}

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn submit_analysis(
        &self,
        request: AnalysisRequest,
        options: SubmitOptions,
    ) -> Result<SubmitResponse, ClientError>;

    async fn poll_status(&self, job: &str) -> Result<StatusReport, ClientError>;

    async fn lookup_account(&self) -> Result<AccountInfo, ClientError>;

    /// Issue reports of an already analyzed job, as raw JSON.
    async fn retrieve_by_reference(&self, job: &str) -> Result<serde_json::Value, ClientError>;
}

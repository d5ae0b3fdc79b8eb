//! Tameshi Orchestrator - Remote Analysis Dispatch
//!
//! Submits compiled contracts to a remote analysis service under a
//! concurrency ceiling, follows each job to a terminal status, and folds the
//! outcomes into a result the report layer can read. Partial failure is a
//! normal result; only an invalid configuration stops a run.

pub mod access;
pub mod aggregator;
pub mod client;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod engine;
pub mod legacy;
pub mod mock_client;
pub mod poller;
pub mod sanitizer;

pub use access::{AccessPolicyGate, Role};
pub use aggregator::{fold, AggregatedResult, ResultAggregator, Verdict};
pub use client::{AccountInfo, AnalysisClient, AnalysisRequest, SubmitOptions, SubmitResponse};
pub use config::{EngineConfig, LimitValue, PollSettings};
pub use core::{
    AnalysisOutcome, ConfigurationError, ContractRecord, Failure, Finding, JobError, JobStatus,
    Severity, StatusReport, Success,
};
pub use dispatcher::{Batch, Dispatcher, RateState};
pub use engine::{AnalysisEngine, RunOutcome};
pub use legacy::LegacyReport;
pub use mock_client::MockAnalysisClient;
pub use poller::{AnalysisJob, JobPoller, PollPolicy};
pub use sanitizer::{sanitize, ArtifactField, SanitizeEvent, Sanitized};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

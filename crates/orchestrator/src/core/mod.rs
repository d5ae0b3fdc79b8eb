//! Data model shared by every stage of the pipeline
//!
//! Records come in from the artifact locator, payloads and status reports go
//! over the wire, and outcomes come back out to the report layer. Everything
//! here is plain data; behavior lives in the stage modules.

pub mod contract;
pub mod error;
pub mod finding;
pub mod outcome;
pub mod severity;
pub mod status;

pub use contract::{AnalysisMode, AnalysisPayload, CompilerInfo, ContractRecord, SourceEntry};
pub use error::{AuthorizationError, ClientError, ConfigurationError, JobError};
pub use finding::{
    collect_findings, Finding, Issue, IssueDescription, IssueReport, ReportMeta, ServiceLog,
    SourceLocation,
};
pub use outcome::{AnalysisOutcome, Failure, Success};
pub use severity::Severity;
pub use status::{JobStatus, StatusReport};

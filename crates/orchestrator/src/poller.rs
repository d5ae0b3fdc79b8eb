//! Per-job lifecycle: submit, poll until terminal, produce one outcome
//!
//! A job moves `Submitted -> Pending -> {Finished, Error, TimedOut}`. A
//! submission that comes back terminal skips polling entirely. Otherwise the
//! job's status is queried every `interval` until it turns terminal or the
//! poll budget, which starts at the first poll, runs out. Every remote call is
//! bounded in time, so a call that never answers still ends the job. Every
//! failure on the way, remote or local, ends as a `Failure` outcome for this
//! job only.

use crate::client::{AnalysisClient, AnalysisRequest, SubmitOptions};
use crate::config::PollSettings;
use crate::core::{
    collect_findings, AnalysisOutcome, ContractRecord, IssueReport, JobError, JobStatus,
    StatusReport,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Budget the service gets to answer a submission.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Shortest delay between two status queries of the same job.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollSettings::default().into()
    }
}

impl From<PollSettings> for PollPolicy {
    fn from(settings: PollSettings) -> Self {
        Self {
            interval: settings.interval(),
            max_wait: settings.timeout(),
        }
    }
}

/// One remote analysis attempt for one contract record.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub ordinal: usize,
    pub contract: String,
    pub handle: Option<String>,
    pub status: JobStatus,
    pub polls: usize,
    pub last_report: Option<StatusReport>,
}

impl AnalysisJob {
    pub fn new(ordinal: usize, contract: impl Into<String>) -> Self {
        Self {
            ordinal,
            contract: contract.into(),
            handle: None,
            status: JobStatus::Submitted,
            polls: 0,
            last_report: None,
        }
    }

    /// Applies a status report from the service.
    ///
    /// Reports arriving after the job turned terminal are ignored.
    pub fn observe(&mut self, report: StatusReport) {
        if self.status.is_terminal() {
            return;
        }
        if self.handle.is_none() {
            self.handle = report.uuid.clone();
        }
        self.status = report.status;
        self.last_report = Some(report);
    }

    pub fn time_out(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::TimedOut;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn last_status_json(&self) -> serde_json::Value {
        self.last_report
            .as_ref()
            .map(StatusReport::to_json)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Drives a single job to its outcome. Cheap to clone; every clone shares
/// the same client.
#[derive(Clone)]
pub struct JobPoller {
    client: Arc<dyn AnalysisClient>,
    policy: PollPolicy,
}

impl JobPoller {
    pub fn new(client: Arc<dyn AnalysisClient>, mut policy: PollPolicy) -> Self {
        policy.interval = policy.interval.max(MIN_POLL_INTERVAL);
        Self { client, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Runs `job` to a terminal state.
    ///
    /// `started` fires right before the submission call goes out, so the
    /// caller can hold back the next job until this one has started.
    pub async fn run(
        &self,
        mut job: AnalysisJob,
        request: AnalysisRequest,
        started: Option<oneshot::Sender<()>>,
    ) -> AnalysisOutcome {
        if let Some(started) = started {
            let _ = started.send(());
        }

        tracing::debug!(job = job.ordinal, contract = %job.contract, "submitting analysis");

        let options = SubmitOptions {
            timeout: SUBMIT_TIMEOUT,
            poll_interval: None,
        };

        let submission = self.client.submit_analysis(request, options);
        let response = match tokio::time::timeout(SUBMIT_TIMEOUT, submission).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(contract = %job.contract, error = %e, "submission failed");
                return AnalysisOutcome::failure(job.contract, JobError::Transport(e));
            }
            Err(_) => {
                tracing::warn!(contract = %job.contract, "submission got no answer in time");
                job.time_out();
                return AnalysisOutcome::failure(
                    job.contract,
                    JobError::Timeout {
                        waited_secs: SUBMIT_TIMEOUT.as_secs(),
                        last_status: serde_json::Value::Null,
                    },
                );
            }
        };

        job.observe(response.status);

        let outcome = match job.status {
            JobStatus::Finished => self.finish_inline(&job, &response.issues),
            JobStatus::Error => AnalysisOutcome::failure(
                job.contract.clone(),
                JobError::Service {
                    status: job.last_status_json(),
                },
            ),
            JobStatus::TimedOut => AnalysisOutcome::failure(
                job.contract.clone(),
                JobError::Timeout {
                    waited_secs: 0,
                    last_status: job.last_status_json(),
                },
            ),
            JobStatus::Submitted | JobStatus::Pending => self.poll_to_end(&mut job).await,
        };

        match &outcome {
            AnalysisOutcome::Success(s) => tracing::info!(
                contract = %s.contract,
                findings = s.findings.len(),
                polls = job.polls,
                "analysis finished"
            ),
            AnalysisOutcome::Failure(f) => tracing::warn!(
                contract = %f.contract,
                status = %job.status,
                reason = %f.reason,
                "analysis failed"
            ),
        }

        outcome
    }

    fn finish_inline(&self, job: &AnalysisJob, issues: &serde_json::Value) -> AnalysisOutcome {
        match IssueReport::parse_list(issues) {
            Ok(reports) => {
                let (findings, logs) = collect_findings(&reports);
                AnalysisOutcome::success(job.contract.clone(), findings, logs)
            }
            Err(reason) => {
                AnalysisOutcome::failure(job.contract.clone(), JobError::MalformedResponse(reason))
            }
        }
    }

    async fn poll_to_end(&self, job: &mut AnalysisJob) -> AnalysisOutcome {
        let Some(handle) = job.handle.clone() else {
            return AnalysisOutcome::failure(
                job.contract.clone(),
                JobError::MalformedResponse(format!(
                    "job left {} without a job handle to poll",
                    job.status
                )),
            );
        };

        let began = Instant::now();
        let deadline = began + self.policy.max_wait;

        loop {
            tokio::time::sleep(self.policy.interval).await;

            job.polls += 1;
            let poll = self.client.poll_status(&handle);
            let report = match tokio::time::timeout_at(deadline, poll).await {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => return AnalysisOutcome::failure(job.contract.clone(), e.into()),
                Err(_) => return Self::timed_out(job, began),
            };

            tracing::debug!(job = %handle, status = %report.status, poll = job.polls, "polled job");
            job.observe(report);

            match job.status {
                JobStatus::Finished => return self.fetch_results(job, &handle).await,
                JobStatus::Error => {
                    return AnalysisOutcome::failure(
                        job.contract.clone(),
                        JobError::Service {
                            status: job.last_status_json(),
                        },
                    )
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Self::timed_out(job, began);
            }
        }
    }

    fn timed_out(job: &mut AnalysisJob, began: Instant) -> AnalysisOutcome {
        job.time_out();
        AnalysisOutcome::failure(
            job.contract.clone(),
            JobError::Timeout {
                waited_secs: began.elapsed().as_secs(),
                last_status: job.last_status_json(),
            },
        )
    }

    async fn fetch_results(&self, job: &AnalysisJob, handle: &str) -> AnalysisOutcome {
        let fetch = self.client.retrieve_by_reference(handle);
        match tokio::time::timeout(SUBMIT_TIMEOUT, fetch).await {
            Ok(Ok(issues)) => self.finish_inline(job, &issues),
            Ok(Err(e)) => AnalysisOutcome::failure(job.contract.clone(), e.into()),
            Err(_) => AnalysisOutcome::failure(
                job.contract.clone(),
                JobError::Timeout {
                    waited_secs: SUBMIT_TIMEOUT.as_secs(),
                    last_status: job.last_status_json(),
                },
            ),
        }
    }
}

/// Builds the outgoing request for an already sanitized record.
pub fn build_request(client_tool_name: &str, record: &ContractRecord) -> AnalysisRequest {
    AnalysisRequest::new(client_tool_name, record.to_payload())
}

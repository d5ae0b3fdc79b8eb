use crate::client::{
    AccountInfo, AnalysisClient, AnalysisRequest, SubmitOptions, SubmitResponse, UserInfo,
};
use crate::core::{ClientError, JobStatus, StatusReport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-process stand-in for the analysis service.
///
/// Submission responses are scripted per contract name, falling back to a
/// shared queue and then to an inline `Finished` with no issues. Status
/// scripts are per job handle; the last scripted status repeats once the
/// script runs dry. Every call is recorded.
///
/// A job counts as in flight from the moment it is submitted until the
/// service gives its last answer about it: a terminal submission response,
/// an `Error` or failed poll, or the retrieval of a finished job's issues.
/// The highest count seen is kept so tests can check the concurrency
/// ceiling across the whole job lifetime, not just the submission call.
pub struct MockAnalysisClient {
    by_contract: Mutex<HashMap<String, VecDeque<Result<SubmitResponse, ClientError>>>>,
    queued: Mutex<VecDeque<Result<SubmitResponse, ClientError>>>,
    status_scripts: Mutex<HashMap<String, VecDeque<Result<StatusReport, ClientError>>>>,
    stored_issues: Mutex<HashMap<String, Result<serde_json::Value, ClientError>>>,
    stalled_jobs: Mutex<HashSet<String>>,
    open_jobs: Mutex<HashSet<String>>,
    account: Mutex<Result<AccountInfo, ClientError>>,
    latency: Duration,

    submissions: Mutex<Vec<(AnalysisRequest, SubmitOptions)>>,
    poll_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for MockAnalysisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalysisClient {
    pub fn new() -> Self {
        Self {
            by_contract: Mutex::new(HashMap::new()),
            queued: Mutex::new(VecDeque::new()),
            status_scripts: Mutex::new(HashMap::new()),
            stored_issues: Mutex::new(HashMap::new()),
            stalled_jobs: Mutex::new(HashSet::new()),
            open_jobs: Mutex::new(HashSet::new()),
            account: Mutex::new(Ok(Self::regular_account())),
            latency: Duration::from_millis(0),
            submissions: Mutex::new(Vec::new()),
            poll_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            retrieve_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every submission stays open this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_response_for(
        self,
        contract: &str,
        response: Result<SubmitResponse, ClientError>,
    ) -> Self {
        self.by_contract
            .lock()
            .entry(contract.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_next_response(self, response: Result<SubmitResponse, ClientError>) -> Self {
        self.queued.lock().push_back(response);
        self
    }

    pub fn with_status_script(
        self,
        job: &str,
        script: Vec<Result<StatusReport, ClientError>>,
    ) -> Self {
        self.status_scripts
            .lock()
            .insert(job.to_string(), script.into_iter().collect());
        self
    }

    /// Status queries for `job` never answer.
    pub fn with_stalled_polls(self, job: &str) -> Self {
        self.stalled_jobs.lock().insert(job.to_string());
        self
    }

    pub fn with_stored_issues(
        self,
        job: &str,
        issues: Result<serde_json::Value, ClientError>,
    ) -> Self {
        self.stored_issues.lock().insert(job.to_string(), issues);
        self
    }

    pub fn with_account(self, account: Result<AccountInfo, ClientError>) -> Self {
        *self.account.lock() = account;
        self
    }

    pub fn with_roles(self, roles: &[&str]) -> Self {
        self.with_account(Ok(AccountInfo {
            total: 1,
            users: vec![UserInfo {
                id: "000000000000000000000001".to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            }],
        }))
    }

    pub fn submissions(&self) -> Vec<(AnalysisRequest, SubmitOptions)> {
        self.submissions.lock().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submissions.lock().len()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn retrieve_count(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// A response that completes synchronously with the given issues.
    pub fn finished(issues: serde_json::Value) -> SubmitResponse {
        SubmitResponse {
            issues,
            status: StatusReport::new(JobStatus::Finished),
        }
    }

    pub fn errored(issues: serde_json::Value) -> SubmitResponse {
        SubmitResponse {
            issues,
            status: StatusReport::new(JobStatus::Error),
        }
    }

    /// A response that leaves the job running under `job`.
    pub fn pending(job: &str, issues: serde_json::Value) -> SubmitResponse {
        SubmitResponse {
            issues,
            status: StatusReport::new(JobStatus::Pending).with_uuid(job),
        }
    }

    fn regular_account() -> AccountInfo {
        AccountInfo {
            total: 1,
            users: vec![UserInfo {
                id: "000000000000000000000001".to_string(),
                roles: vec!["regular_user".to_string()],
            }],
        }
    }

    fn open(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn close(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Closes `job` if it is still open.
    fn close_job(&self, job: &str) {
        if self.open_jobs.lock().remove(job) {
            self.close();
        }
    }

    fn scripted_status(&self, job: &str) -> Result<StatusReport, ClientError> {
        let mut scripts = self.status_scripts.lock();
        let Some(script) = scripts.get_mut(job) else {
            return Ok(StatusReport::new(JobStatus::Finished).with_uuid(job));
        };

        match script.len() {
            0 => Ok(StatusReport::new(JobStatus::Finished).with_uuid(job)),
            1 => script
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(StatusReport::new(JobStatus::Finished))),
            _ => script
                .pop_front()
                .unwrap_or_else(|| Ok(StatusReport::new(JobStatus::Finished))),
        }
    }

    fn next_response(&self, contract: &str) -> Result<SubmitResponse, ClientError> {
        if let Some(script) = self.by_contract.lock().get_mut(contract) {
            if let Some(response) = script.pop_front() {
                return response;
            }
        }

        self.queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::finished(serde_json::json!([]))))
    }
}

#[async_trait]
impl AnalysisClient for MockAnalysisClient {
    async fn submit_analysis(
        &self,
        request: AnalysisRequest,
        options: SubmitOptions,
    ) -> Result<SubmitResponse, ClientError> {
        let contract = request.data.contract_name.clone();
        self.submissions.lock().push((request, options));

        self.open();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        let response = self.next_response(&contract);
        match &response {
            Ok(r) if !r.status.status.is_terminal() && r.status.uuid.is_some() => {
                if let Some(job) = &r.status.uuid {
                    self.open_jobs.lock().insert(job.clone());
                }
            }
            _ => self.close(),
        }
        response
    }

    async fn poll_status(&self, job: &str) -> Result<StatusReport, ClientError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);

        let stalled = self.stalled_jobs.lock().contains(job);
        if stalled {
            std::future::pending::<()>().await;
        }

        let report = self.scripted_status(job);
        match &report {
            Ok(r) if r.status != JobStatus::Error => {}
            _ => self.close_job(job),
        }
        report
    }

    async fn lookup_account(&self) -> Result<AccountInfo, ClientError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.account.lock().clone()
    }

    async fn retrieve_by_reference(&self, job: &str) -> Result<serde_json::Value, ClientError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.close_job(job);
        self.stored_issues
            .lock()
            .get(job)
            .cloned()
            .unwrap_or_else(|| Ok(serde_json::json!([])))
    }
}

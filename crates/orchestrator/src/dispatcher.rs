//! Bounded fan-out of analysis jobs
//!
//! At most `ceiling` jobs are in flight at once. A slot frees up when its job
//! reaches a terminal status and the next queued record is started right
//! away. Jobs start in record order; they finish in whatever order the
//! service answers, and outcomes are returned in that completion order.

use crate::client::AnalysisClient;
use crate::config::{EngineConfig, LimitValue};
use crate::core::{AnalysisOutcome, ConfigurationError, ContractRecord, JobError};
use crate::poller::{build_request, AnalysisJob, JobPoller, PollPolicy};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// In-flight accounting for one dispatch batch.
///
/// Admission goes through the semaphore, so the ceiling holds even if the
/// counter is read mid-update. The counter exists for observation.
#[derive(Debug)]
pub struct RateState {
    ceiling: usize,
    permits: Arc<Semaphore>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RateState {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            permits: Arc::new(Semaphore::new(ceiling)),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Waits for a free slot.
    pub async fn admit(self: Arc<Self>) -> Result<Admission, AcquireError> {
        let permit = self.permits.clone().acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Admission {
            state: self,
            _permit: permit,
        })
    }
}

/// A held slot. Dropping it, on completion or when the job is aborted,
/// gives the slot back.
#[derive(Debug)]
pub struct Admission {
    state: Arc<RateState>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Result of a batch that may have been cut short.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Outcomes in completion order.
    pub outcomes: Vec<AnalysisOutcome>,
    /// Contracts that never reached a terminal status, in record order.
    pub abandoned: Vec<String>,
    pub peak_in_flight: usize,
}

pub struct Dispatcher {
    poller: JobPoller,
    limit: LimitValue,
    max_limit: usize,
    client_tool_name: String,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn AnalysisClient>, config: &EngineConfig) -> Self {
        Self {
            poller: JobPoller::new(client, PollPolicy::from(config.poll)),
            limit: config.limit.clone(),
            max_limit: config.max_limit,
            client_tool_name: config.client_tool_name.clone(),
        }
    }

    /// Checks the limit without dispatching anything.
    pub fn ceiling(&self) -> Result<usize, ConfigurationError> {
        self.limit.ceiling(self.max_limit)
    }

    /// Analyzes every record and returns one outcome per record.
    ///
    /// Records must already be sanitized. Fails only on an invalid limit,
    /// and then before any remote call.
    pub async fn dispatch(
        &self,
        records: Vec<ContractRecord>,
    ) -> Result<Vec<AnalysisOutcome>, ConfigurationError> {
        let batch = self
            .dispatch_until(records, std::future::pending::<()>())
            .await?;
        Ok(batch.outcomes)
    }

    /// Like [`dispatch`](Self::dispatch), but stops when `shutdown`
    /// resolves. Running jobs are aborted and, together with records not
    /// yet started, reported as abandoned.
    pub async fn dispatch_until<F>(
        &self,
        records: Vec<ContractRecord>,
        shutdown: F,
    ) -> Result<Batch, ConfigurationError>
    where
        F: Future<Output = ()>,
    {
        let ceiling = self.ceiling()?;
        let rate = Arc::new(RateState::new(ceiling));

        warn_on_duplicates(&records);
        tracing::info!(jobs = records.len(), ceiling, "dispatching analysis batch");

        let total = records.len();
        let mut queue = records.into_iter().enumerate().peekable();
        let mut running: JoinSet<(usize, AnalysisOutcome)> = JoinSet::new();
        let mut unfinished: BTreeMap<usize, String> = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut abandoned = Vec::new();

        tokio::pin!(shutdown);

        loop {
            if queue.peek().is_none() && running.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    running.abort_all();
                    tracing::warn!(
                        running = unfinished.len(),
                        queued = queue.len(),
                        "dispatch interrupted; abandoning unfinished jobs"
                    );
                    abandoned.extend(unfinished.into_values());
                    abandoned.extend(queue.map(|(_, record)| record.contract_name));
                    return Ok(Batch {
                        outcomes,
                        abandoned,
                        peak_in_flight: rate.peak(),
                    });
                }

                joined = running.join_next(), if !running.is_empty() => {
                    match joined {
                        Some(Ok((ordinal, outcome))) => {
                            unfinished.remove(&ordinal);
                            outcomes.push(outcome);
                        }
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "analysis task did not complete");
                        }
                        None => {}
                    }
                }

                admitted = rate.clone().admit(), if queue.peek().is_some() => {
                    let admission = match admitted {
                        Ok(admission) => admission,
                        Err(e) => {
                            tracing::error!(error = %e, "admission closed");
                            break;
                        }
                    };
                    let Some((ordinal, record)) = queue.next() else {
                        continue;
                    };

                    let job = AnalysisJob::new(ordinal, record.contract_name.clone());
                    let request = build_request(&self.client_tool_name, &record);
                    let poller = self.poller.clone();
                    let (started_tx, started_rx) = oneshot::channel();

                    unfinished.insert(ordinal, record.contract_name);
                    running.spawn(async move {
                        let _admission = admission;
                        let outcome = poller.run(job, request, Some(started_tx)).await;
                        (ordinal, outcome)
                    });

                    // Hold the next record back until this job has started.
                    let _ = started_rx.await;
                }
            }
        }

        // Whatever is left was lost to a panicked task or a closed admission.
        for (_, contract) in unfinished {
            outcomes.push(AnalysisOutcome::failure(
                contract,
                JobError::Aborted("job ended without an outcome".to_string()),
            ));
        }
        abandoned.extend(queue.map(|(_, record)| record.contract_name));

        tracing::info!(
            outcomes = outcomes.len(),
            peak_in_flight = rate.peak(),
            "analysis batch complete"
        );

        Ok(Batch {
            outcomes,
            abandoned,
            peak_in_flight: rate.peak(),
        })
    }
}

fn warn_on_duplicates(records: &[ContractRecord]) {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.contract_name.as_str()) {
            tracing::warn!(
                contract = %record.contract_name,
                "contract appears more than once in the batch; each copy is analyzed"
            );
        }
    }
}

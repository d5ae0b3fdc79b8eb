use crate::access::AccessPolicyGate;
use crate::aggregator::{fold, AggregatedResult};
use crate::client::AnalysisClient;
use crate::config::EngineConfig;
use crate::core::{ConfigurationError, ContractRecord, IssueReport};
use crate::dispatcher::Dispatcher;
use crate::legacy::LegacyReport;
use crate::sanitizer::{sanitize, SanitizeEvent};
use std::future::Future;
use std::sync::Arc;

type EventSink = Box<dyn Fn(&SanitizeEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Fresh analysis of the given records.
    Analyzed(AggregatedResult),
    /// Issues of a previous job, retrieved by reference.
    Retrieved(LegacyReport),
}

impl RunOutcome {
    pub fn as_analyzed(&self) -> Option<&AggregatedResult> {
        match self {
            Self::Analyzed(result) => Some(result),
            Self::Retrieved(_) => None,
        }
    }

    pub fn as_retrieved(&self) -> Option<&LegacyReport> {
        match self {
            Self::Retrieved(report) => Some(report),
            Self::Analyzed(_) => None,
        }
    }
}

/// One invocation: gate, sanitize, dispatch, fold.
pub struct AnalysisEngine {
    client: Arc<dyn AnalysisClient>,
    config: EngineConfig,
    sink: EventSink,
}

impl AnalysisEngine {
    pub fn new(client: Arc<dyn AnalysisClient>, config: EngineConfig) -> Self {
        Self {
            client,
            config,
            sink: Box::new(|event| tracing::debug!("{}", event)),
        }
    }

    /// Replaces the default sink, which forwards sanitizer events to
    /// `tracing` at debug level.
    pub fn with_event_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&SanitizeEvent) + Send + Sync + 'static,
    {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn run(&self, records: Vec<ContractRecord>) -> Result<RunOutcome, ConfigurationError> {
        self.run_until(records, std::future::pending::<()>()).await
    }

    /// Runs until done or until `shutdown` resolves, whichever comes first.
    /// An interrupted batch still yields the outcomes gathered so far.
    pub async fn run_until<F>(
        &self,
        records: Vec<ContractRecord>,
        shutdown: F,
    ) -> Result<RunOutcome, ConfigurationError>
    where
        F: Future<Output = ()>,
    {
        let dispatcher = Dispatcher::new(self.client.clone(), &self.config);
        dispatcher.ceiling()?;

        if let Some(reference) = &self.config.job_reference {
            if let Some(report) = self.retrieve(reference).await {
                return Ok(RunOutcome::Retrieved(report));
            }
        }

        let clean = self.sanitize_all(&records);
        let batch = dispatcher.dispatch_until(clean, shutdown).await?;
        let result = fold(batch.outcomes).with_abandoned(batch.abandoned);

        tracing::info!(
            successes = result.success_count(),
            failures = result.failure_count(),
            findings = result.finding_count(),
            verdict = %result.verdict(),
            "analysis complete"
        );

        Ok(RunOutcome::Analyzed(result))
    }

    pub fn sanitize_all(&self, records: &[ContractRecord]) -> Vec<ContractRecord> {
        records
            .iter()
            .map(|record| sanitize(record, self.config.diagnostics, |e| (self.sink)(e)).record)
            .collect()
    }

    /// `None` means fall back to fresh analysis.
    async fn retrieve(&self, reference: &str) -> Option<LegacyReport> {
        let role = match AccessPolicyGate::authorize(self.client.as_ref()).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(error = %e, "account lookup failed; analyzing instead");
                return None;
            }
        };

        if !role.can_retrieve_by_reference() {
            tracing::warn!(
                job = reference,
                "account may not retrieve jobs by reference; analyzing instead"
            );
            return None;
        }

        let issues = match self.client.retrieve_by_reference(reference).await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(job = reference, error = %e, "retrieval failed; analyzing instead");
                return None;
            }
        };

        match IssueReport::parse_list(&issues) {
            Ok(reports) => {
                tracing::info!(job = reference, reports = reports.len(), "retrieved job by reference");
                Some(LegacyReport::render(reference, &reports))
            }
            Err(reason) => {
                tracing::warn!(job = reference, %reason, "retrieved issues unreadable; analyzing instead");
                None
            }
        }
    }
}

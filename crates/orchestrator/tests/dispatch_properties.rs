use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tameshi_orchestrator::sanitizer::EMPTY_BYTECODE;
use tameshi_orchestrator::{
    fold, sanitize, ArtifactField, ContractRecord, Dispatcher, EngineConfig, JobStatus,
    MockAnalysisClient, StatusReport,
};

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

/// Every third job is polled a few times before it finishes, every fifth
/// fails at the service.
fn scripted_client(jobs: usize, latency: Duration) -> MockAnalysisClient {
    let mut client = MockAnalysisClient::new().with_latency(latency);
    for i in 0..jobs {
        let name = format!("C{}", i);
        if i % 5 == 4 {
            client = client.with_response_for(&name, Ok(MockAnalysisClient::errored(json!([]))));
        } else if i % 3 == 0 {
            let job = format!("job-{}", i);
            let mut script: Vec<_> = (0..1 + i % 4)
                .map(|_| Ok(StatusReport::new(JobStatus::Pending)))
                .collect();
            script.push(Ok(StatusReport::new(JobStatus::Finished)));
            client = client
                .with_response_for(&name, Ok(MockAnalysisClient::pending(&job, json!([]))))
                .with_status_script(&job, script);
        }
    }
    client
}

fn records(jobs: usize) -> Vec<ContractRecord> {
    (0..jobs)
        .map(|i| ContractRecord::new(format!("C{}", i)).with_bytecode("0x6080"))
        .collect()
}

fn artifact() -> impl Strategy<Value = Option<Option<String>>> {
    prop_oneof![
        Just(None),
        Just(Some(None)),
        Just(Some(Some(String::new()))),
        Just(Some(Some(EMPTY_BYTECODE.to_string()))),
        "0x[0-9a-f]{2,16}".prop_map(|s| Some(Some(s))),
        "[0-9]{1,3}:[0-9]{1,2}:0".prop_map(|s| Some(Some(s))),
    ]
}

fn record_strategy() -> impl Strategy<Value = ContractRecord> {
    (artifact(), artifact(), artifact(), artifact()).prop_map(|(bc, dbc, sm, dsm)| {
        let mut record = ContractRecord::new("Generated");
        record.bytecode = bc;
        record.deployed_bytecode = dbc;
        record.source_map = sm;
        record.deployed_source_map = dsm;
        record
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn in_flight_never_exceeds_ceiling(
        limit in 1usize..=8,
        jobs in 0usize..24,
        latency_ms in 1u64..40,
    ) {
        let client = Arc::new(scripted_client(jobs, Duration::from_millis(latency_ms)));
        let config = EngineConfig::default().with_limit(limit);

        let outcomes = paused_runtime().block_on(async {
            Dispatcher::new(client.clone(), &config)
                .dispatch(records(jobs))
                .await
                .unwrap()
        });

        prop_assert_eq!(outcomes.len(), jobs);
        prop_assert!(client.peak_in_flight() <= limit);
        prop_assert_eq!(client.in_flight(), 0);
        prop_assert_eq!(client.submit_count(), jobs);
    }

    #[test]
    fn every_job_is_counted_once(limit in 1usize..=6, jobs in 0usize..20) {
        let client = Arc::new(scripted_client(jobs, Duration::from_millis(5)));
        let config = EngineConfig::default().with_limit(limit);

        let outcomes = paused_runtime().block_on(async {
            Dispatcher::new(client, &config).dispatch(records(jobs)).await.unwrap()
        });
        let result = fold(outcomes);

        prop_assert_eq!(result.success_count() + result.failure_count(), jobs);
        prop_assert_eq!(result.failure_count(), jobs / 5);

        let mut seen: Vec<String> = result
            .successes
            .iter()
            .map(|s| s.contract.clone())
            .chain(result.failures.iter().map(|f| f.contract.clone()))
            .collect();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), jobs);
    }

    #[test]
    fn sanitizing_twice_changes_nothing(record in record_strategy()) {
        let once = sanitize(&record, true, |_| {});

        let mut calls = 0;
        let twice = sanitize(&once.record, true, |_| calls += 1);

        prop_assert_eq!(calls, 0);
        prop_assert!(twice.stripped.is_empty());
        prop_assert_eq!(twice.record, once.record);
    }

    #[test]
    fn only_the_placeholder_bytecode_is_stripped(code in "[ -~]{1,12}") {
        let record = ContractRecord::new("Generated").with_bytecode(code.clone());
        let result = sanitize(&record, false, |_| {});

        if code == EMPTY_BYTECODE {
            prop_assert!(result.stripped.contains(&ArtifactField::Bytecode));
            prop_assert_eq!(result.record.bytecode, None);
        } else {
            prop_assert!(result.stripped.is_empty());
            prop_assert_eq!(result.record.bytecode, Some(Some(code)));
        }
    }

    #[test]
    fn placeholder_bytecode_always_stripped(record in record_strategy()) {
        let record = record.with_bytecode(EMPTY_BYTECODE);
        let result = sanitize(&record, false, |_| {});

        prop_assert!(result.stripped.contains(&ArtifactField::Bytecode));
        prop_assert_eq!(result.record.bytecode, None);
    }
}

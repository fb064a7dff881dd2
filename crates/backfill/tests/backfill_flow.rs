//! Backfill checkers driven through the job runner against the in-memory adapters.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock, Mutex};

use chrono::NaiveDate;

use nagini_backfill::{
    BackfillProbe, DataChecker, DataProbe, FixedClock, Granularity, IntervalChecker,
    IntervalCheckerConfig, SourceWithoutDestination, TimeBucket, checker_definition,
};
use nagini_core::{JobError, JobResult};
use nagini_infra::{InMemoryOrchestrator, InMemoryPropertyStore};
use nagini_jobs::{FlowHandle, FlowParams, JobDefinition, JobRunner};

static ROLLUP_CHECKER: LazyLock<JobDefinition> =
    LazyLock::new(|| checker_definition("rollup_checker").unwrap());

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Partitions keyed by bucket start; `built` is filled by the "flow".
#[derive(Default)]
struct Partitions {
    landed: BTreeSet<NaiveDate>,
    built: Mutex<BTreeSet<NaiveDate>>,
}

impl BackfillProbe for Partitions {
    fn src_data_exists(&self, bucket: &TimeBucket) -> JobResult<bool> {
        Ok(self.landed.contains(&bucket.start))
    }

    fn dst_data_exists(&self, bucket: &TimeBucket) -> JobResult<bool> {
        Ok(self
            .built
            .lock()
            .map_err(|_| anyhow::anyhow!("probe poisoned"))?
            .contains(&bucket.start))
    }
}

fn monthly_checker(
    probe: Arc<Partitions>,
    orchestrator: Arc<InMemoryOrchestrator>,
    interval: u32,
) -> IntervalChecker<Arc<Partitions>> {
    let flow = FlowHandle::new("warehouse", "monthly_rollup", orchestrator);
    IntervalChecker::new(
        ROLLUP_CHECKER.clone(),
        IntervalCheckerConfig::new(Granularity::Monthly, interval),
        probe,
        flow,
    )
    .with_clock(FixedClock::on(date(2023, 6, 15)))
}

#[test]
fn monthly_backfill_mid_june_checks_april_and_may() {
    nagini_observability::init();

    let probe = Arc::new(Partitions {
        landed: [date(2023, 4, 1), date(2023, 5, 1)].into(),
        ..Partitions::default()
    });
    let orchestrator = InMemoryOrchestrator::arc();
    let checker = monthly_checker(probe, orchestrator.clone(), 2);

    let buckets: Vec<_> = checker.buckets().iter().map(|b| (b.start, b.end)).collect();
    assert_eq!(
        buckets,
        vec![
            (date(2023, 4, 1), date(2023, 5, 1)),
            (date(2023, 5, 1), date(2023, 6, 1)),
        ]
    );

    let report = JobRunner::new(InMemoryPropertyStore::new())
        .execute_job(checker)
        .unwrap();
    assert!(!report.skipped);

    let months: Vec<_> = orchestrator
        .triggers_of("monthly_rollup")
        .into_iter()
        .map(|t| t.params["month"].clone())
        .collect();
    assert_eq!(months, vec!["2023-04", "2023-05"]);
}

#[test]
fn repeated_runs_stop_triggering_once_destination_exists() {
    let probe = Arc::new(Partitions {
        landed: [date(2023, 5, 1)].into(),
        ..Partitions::default()
    });
    let orchestrator = InMemoryOrchestrator::arc();
    let store = InMemoryPropertyStore::new();
    let runner = JobRunner::new(&store);

    runner
        .execute_job(monthly_checker(probe.clone(), orchestrator.clone(), 0))
        .unwrap();
    assert_eq!(orchestrator.triggers().len(), 1);

    // The triggered flow builds May.
    probe.built.lock().unwrap().insert(date(2023, 5, 1));

    runner
        .execute_job(monthly_checker(probe, orchestrator.clone(), 0))
        .unwrap();
    assert_eq!(orchestrator.triggers().len(), 1);
    assert_eq!(store.save_count(), 2);
}

#[test]
fn missing_source_is_not_an_error() {
    let orchestrator = InMemoryOrchestrator::arc();
    let checker = monthly_checker(Arc::new(Partitions::default()), orchestrator.clone(), 3);

    JobRunner::new(InMemoryPropertyStore::new())
        .execute_job(checker)
        .unwrap();

    assert!(orchestrator.triggers().is_empty());
}

#[test]
fn properties_override_granularity_and_interval() {
    let probe = Arc::new(Partitions {
        landed: [date(2023, 6, 12), date(2023, 6, 13), date(2023, 6, 14)].into(),
        ..Partitions::default()
    });
    let orchestrator = InMemoryOrchestrator::arc();
    let store = InMemoryPropertyStore::with_properties([
        ("granularity", "daily"),
        ("check_interval", "3"),
    ]);

    JobRunner::new(&store)
        .execute_job(monthly_checker(probe, orchestrator.clone(), 2))
        .unwrap();

    let days: Vec<_> = orchestrator
        .triggers()
        .into_iter()
        .map(|t| t.params["day"].clone())
        .collect();
    assert_eq!(days, vec!["2023-06-12", "2023-06-13", "2023-06-14"]);
}

#[test]
fn weekly_trigger_carries_week_start_and_end() {
    let probe = Arc::new(Partitions {
        landed: [date(2023, 6, 5)].into(),
        ..Partitions::default()
    });
    let orchestrator = InMemoryOrchestrator::arc();
    let flow = FlowHandle::new("warehouse", "weekly_rollup", orchestrator.clone());
    let checker = IntervalChecker::new(
        checker_definition("weekly_checker").unwrap(),
        IntervalCheckerConfig::new(Granularity::Weekly, 1),
        probe,
        flow,
    )
    .with_base_params(FlowParams::from([("env".to_string(), "prod".to_string())]))
    .with_clock(FixedClock::on(date(2023, 6, 15)));

    checker.check().unwrap();

    let triggers = orchestrator.triggers();
    assert_eq!(triggers.len(), 1);
    let params = &triggers[0].params;
    assert_eq!(params["week"], "2023-06-05");
    assert_eq!(params["start"], "2023-06-05");
    assert_eq!(params["end"], "2023-06-12");
    assert_eq!(params["env"], "prod");
}

#[test]
fn rejected_trigger_fails_the_run() {
    let probe = Arc::new(Partitions {
        landed: [date(2023, 5, 1)].into(),
        ..Partitions::default()
    });
    let orchestrator = InMemoryOrchestrator::arc();
    orchestrator.reject_next("project locked");

    let err = JobRunner::new(InMemoryPropertyStore::new())
        .execute_job(monthly_checker(probe, orchestrator, 0))
        .unwrap_err();

    assert!(matches!(err, JobError::Flow(_)));
}

#[test]
fn invalid_granularity_property_is_a_conversion_error() {
    let store = InMemoryPropertyStore::with_properties([("granularity", "hourly")]);
    let checker = monthly_checker(
        Arc::new(Partitions::default()),
        InMemoryOrchestrator::arc(),
        1,
    );

    let err = JobRunner::new(&store).execute_job(checker).unwrap_err();

    assert!(matches!(err, JobError::FieldConversion { ref field, .. } if field == "granularity"));
}

#[test]
fn oversized_check_interval_property_is_rejected() {
    let store = InMemoryPropertyStore::with_properties([("check_interval", "4294967295")]);
    let orchestrator = InMemoryOrchestrator::arc();
    let checker = monthly_checker(Arc::new(Partitions::default()), orchestrator.clone(), 1);

    let err = JobRunner::new(&store).execute_job(checker).unwrap_err();

    assert!(matches!(err, JobError::FieldConversion { ref field, .. } if field == "check_interval"));
    assert!(orchestrator.triggers().is_empty());
}

struct Table {
    src: bool,
    dst: bool,
}

impl DataProbe for Table {
    fn src_data_exists(&self) -> JobResult<bool> {
        Ok(self.src)
    }

    fn dst_data_exists(&self) -> JobResult<bool> {
        Ok(self.dst)
    }
}

#[test]
fn data_checker_triggers_once_when_update_needed() {
    let orchestrator = InMemoryOrchestrator::arc();
    let flow = FlowHandle::new("warehouse", "refresh", orchestrator.clone());
    let checker = DataChecker::new(
        JobDefinition::builder("refresh_checker").build().unwrap(),
        SourceWithoutDestination(Table {
            src: true,
            dst: false,
        }),
        flow,
    )
    .with_params(FlowParams::from([("table".to_string(), "orders".to_string())]));

    JobRunner::new(InMemoryPropertyStore::new())
        .execute_job(checker)
        .unwrap();

    let triggers = orchestrator.triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].params["table"], "orders");
}

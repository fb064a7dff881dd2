//! Interval backfill: trigger a flow for every recent bucket whose destination
//! data is missing but whose source data is present.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nagini_core::{Field, FieldValue, JobError, JobResult};
use nagini_jobs::{
    ConfigureContext, ExecutionId, FlowHandle, FlowParams, Job, JobDefinition, RunContext,
};

use crate::bucket::{Granularity, TimeBucket, buckets};
use crate::clock::{Clock, SystemClock};

/// Property overriding the configured granularity.
pub const GRANULARITY_FIELD: &str = "granularity";
/// Property overriding the configured lookback.
pub const CHECK_INTERVAL_FIELD: &str = "check_interval";
/// Largest lookback accepted from properties.
pub const MAX_CHECK_INTERVAL: u32 = 10_000;

/// Data existence checks for one bucket.
///
/// Both predicates may race with other processes; a stale answer only delays or
/// repeats a trigger.
pub trait BackfillProbe {
    fn src_data_exists(&self, bucket: &TimeBucket) -> JobResult<bool>;

    fn dst_data_exists(&self, bucket: &TimeBucket) -> JobResult<bool>;
}

impl<P: BackfillProbe + ?Sized> BackfillProbe for Arc<P> {
    fn src_data_exists(&self, bucket: &TimeBucket) -> JobResult<bool> {
        (**self).src_data_exists(bucket)
    }

    fn dst_data_exists(&self, bucket: &TimeBucket) -> JobResult<bool> {
        (**self).dst_data_exists(bucket)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalCheckerConfig {
    pub granularity: Granularity,
    /// Number of completed buckets to look back; 0 checks the last one only.
    pub check_interval: u32,
}

impl IntervalCheckerConfig {
    pub fn new(granularity: Granularity, check_interval: u32) -> Self {
        Self {
            granularity,
            check_interval,
        }
    }
}

/// What happened to one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketDecision {
    /// Destination data exists; nothing to do
    AlreadyPresent,
    /// Flow triggered for this bucket
    Triggered(ExecutionId),
    /// Neither source nor destination data yet; try again later
    SourceMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOutcome {
    pub bucket: TimeBucket,
    pub decision: BucketDecision,
}

/// Definition for an interval checker named `name`, declaring the override fields.
///
/// Build it once per checker flow and clone it into each instance. Extend it to
/// add fields of your own.
pub fn checker_definition(name: impl Into<String>) -> JobResult<JobDefinition> {
    JobDefinition::builder(name)
        .field(Field::text(GRANULARITY_FIELD))
        .field(Field::integer(CHECK_INTERVAL_FIELD))
        .build()
}

/// Job that backfills missing buckets by triggering a flow per bucket.
///
/// Granularity and lookback come from [`IntervalCheckerConfig`] and can be
/// overridden through the `granularity` and `check_interval` properties when the
/// definition comes from [`checker_definition`].
pub struct IntervalChecker<P> {
    def: JobDefinition,
    config: IntervalCheckerConfig,
    probe: P,
    flow: FlowHandle,
    base_params: FlowParams,
    clock: Box<dyn Clock>,
}

impl<P: BackfillProbe> IntervalChecker<P> {
    pub fn new(
        def: JobDefinition,
        config: IntervalCheckerConfig,
        probe: P,
        flow: FlowHandle,
    ) -> Self {
        Self {
            def,
            config,
            probe,
            flow,
            base_params: FlowParams::new(),
            clock: Box::new(SystemClock),
        }
    }

    /// Parameters passed with every trigger; bucket keys take precedence.
    pub fn with_base_params(mut self, params: FlowParams) -> Self {
        self.base_params = params;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> IntervalCheckerConfig {
        self.config
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Buckets to check right now, oldest first.
    pub fn buckets(&self) -> Vec<TimeBucket> {
        buckets(
            self.config.granularity,
            self.config.check_interval,
            self.clock.today(),
        )
    }

    /// Walk the buckets oldest to newest and trigger the flow where needed.
    ///
    /// Each bucket is triggered at most once per call. Probe and orchestrator
    /// errors abort the walk.
    pub fn check(&self) -> JobResult<Vec<BucketOutcome>> {
        let mut outcomes = Vec::new();

        for bucket in self.buckets() {
            let decision = self.decide(&bucket)?;
            outcomes.push(BucketOutcome { bucket, decision });
        }

        Ok(outcomes)
    }

    fn decide(&self, bucket: &TimeBucket) -> JobResult<BucketDecision> {
        if self.probe.dst_data_exists(bucket)? {
            debug!(job = %self.def.name(), bucket = %bucket, "destination data present");
            return Ok(BucketDecision::AlreadyPresent);
        }

        info!(job = %self.def.name(), bucket = %bucket, "destination data missing");
        if !self.probe.src_data_exists(bucket)? {
            info!(job = %self.def.name(), bucket = %bucket, "source data missing, waiting");
            return Ok(BucketDecision::SourceMissing);
        }

        let mut params = self.base_params.clone();
        params.extend(bucket.params());
        info!(
            job = %self.def.name(),
            bucket_start = %bucket.start,
            bucket_end = %bucket.end,
            flow = %self.flow.name(),
            "starting backfill"
        );
        let id = self.flow.start(&params)?;
        Ok(BucketDecision::Triggered(id))
    }

    fn apply_overrides(&mut self, ctx: &ConfigureContext<'_>) -> JobResult<()> {
        if let Some(raw) = ctx.fields().opt_text(GRANULARITY_FIELD) {
            self.config.granularity = raw
                .parse::<Granularity>()
                .map_err(|e| JobError::conversion(GRANULARITY_FIELD, raw, e.to_string()))?;
        }

        if let Some(FieldValue::Integer(n)) = ctx.fields().get(CHECK_INTERVAL_FIELD) {
            self.config.check_interval = u32::try_from(*n)
                .ok()
                .filter(|n| *n <= MAX_CHECK_INTERVAL)
                .ok_or_else(|| {
                    JobError::conversion(
                        CHECK_INTERVAL_FIELD,
                        n.to_string(),
                        format!("must be a count between 0 and {MAX_CHECK_INTERVAL}"),
                    )
                })?;
        }
        Ok(())
    }
}

impl<P: BackfillProbe> Job for IntervalChecker<P> {
    fn definition(&self) -> &JobDefinition {
        &self.def
    }

    fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> JobResult<()> {
        self.apply_overrides(ctx)
    }

    fn run(&mut self, _ctx: &mut RunContext<'_>) -> JobResult<()> {
        let outcomes = self.check()?;

        let triggered = outcomes
            .iter()
            .filter(|o| matches!(o.decision, BucketDecision::Triggered(_)))
            .count();
        let waiting = outcomes
            .iter()
            .filter(|o| o.decision == BucketDecision::SourceMissing)
            .count();
        info!(
            job = %self.def.name(),
            granularity = %self.config.granularity,
            checked = outcomes.len(),
            triggered,
            waiting,
            "interval check finished"
        );
        Ok(())
    }
}

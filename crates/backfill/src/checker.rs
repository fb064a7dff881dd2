//! Single-shot checker: trigger a flow once when an update is needed.

use tracing::info;

use nagini_core::JobResult;
use nagini_jobs::{ExecutionId, FlowHandle, FlowParams, Job, JobDefinition, RunContext};

/// Decides whether the checked flow must run.
pub trait CheckProbe {
    fn need_update(&self) -> JobResult<bool>;
}

/// Source/destination existence checks without any time bucket.
pub trait DataProbe {
    fn src_data_exists(&self) -> JobResult<bool>;

    fn dst_data_exists(&self) -> JobResult<bool>;
}

/// Adapter: an update is needed when the source exists and the destination does not.
#[derive(Debug, Clone)]
pub struct SourceWithoutDestination<P>(pub P);

impl<P: DataProbe> CheckProbe for SourceWithoutDestination<P> {
    fn need_update(&self) -> JobResult<bool> {
        if self.0.dst_data_exists()? {
            return Ok(false);
        }
        self.0.src_data_exists()
    }
}

/// Job that triggers `flow` once per run when `probe` says so.
pub struct DataChecker<C> {
    def: JobDefinition,
    probe: C,
    flow: FlowHandle,
    params: FlowParams,
}

impl<C: CheckProbe> DataChecker<C> {
    pub fn new(def: JobDefinition, probe: C, flow: FlowHandle) -> Self {
        Self {
            def,
            probe,
            flow,
            params: FlowParams::new(),
        }
    }

    pub fn with_params(mut self, params: FlowParams) -> Self {
        self.params = params;
        self
    }

    pub fn probe(&self) -> &C {
        &self.probe
    }

    /// Trigger the flow if an update is needed. Returns the execution id, if any.
    pub fn check(&self) -> JobResult<Option<ExecutionId>> {
        if !self.probe.need_update()? {
            info!(job = %self.def.name(), "no update needed");
            return Ok(None);
        }

        let id = self.flow.start(&self.params)?;
        Ok(Some(id))
    }
}

impl<C: CheckProbe> Job for DataChecker<C> {
    fn definition(&self) -> &JobDefinition {
        &self.def
    }

    fn run(&mut self, _ctx: &mut RunContext<'_>) -> JobResult<()> {
        self.check().map(|_| ())
    }
}

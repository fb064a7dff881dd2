//! Ready-made housekeeping jobs.

use tracing::info;

use nagini_core::JobResult;

use crate::definition::JobDefinition;
use crate::job::{Job, RunContext};

/// Removes the run's data directory. A run without `working.dir` does nothing.
pub struct ClearDataDir {
    def: JobDefinition,
}

impl ClearDataDir {
    /// Definition named `ClearDataDir`; build once and clone into instances.
    pub fn definition() -> JobResult<JobDefinition> {
        JobDefinition::for_type::<Self>().build()
    }

    pub fn new(def: JobDefinition) -> Self {
        Self { def }
    }
}

impl Job for ClearDataDir {
    fn definition(&self) -> &JobDefinition {
        &self.def
    }

    fn run(&mut self, ctx: &mut RunContext<'_>) -> JobResult<()> {
        if let Some(dir) = ctx.props().data_dir() {
            info!(job = %ctx.job_name(), dir = %dir.display(), "clearing data directory");
        }
        ctx.clear_data_dir()
    }
}

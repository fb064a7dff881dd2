//! The job contract.

use std::path::PathBuf;

use anyhow::anyhow;

use nagini_core::target::clean_up_all;
use nagini_core::{Fields, JobError, JobResult, Outputs, PropertyContext};

use crate::definition::JobDefinition;
use crate::resolve::{Inputs, Requirement};

/// A unit of work with declared dependencies, outputs and a `run()` body.
///
/// Implementations only describe the job; [`JobRunner`](crate::JobRunner) drives
/// the lifecycle:
///
/// 1. fields are bound from the property context
/// 2. `configure()` runs, then every required job is configured (never run)
/// 3. if every declared output already exists, `run()` is skipped
/// 4. otherwise `run()` runs and every declared output must exist afterwards
/// 5. `on_success()` or `on_failure()` fires
///
/// A job with no declared outputs always runs and is never checked.
pub trait Job {
    /// Type-level metadata (name, retry hints, fields).
    fn definition(&self) -> &JobDefinition;

    /// Derived setup after field binding. Must not perform I/O beyond local state.
    fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> JobResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Jobs whose outputs this job consumes. Evaluated at most once per instance.
    fn requires(&self) -> Requirement {
        Requirement::None
    }

    /// Targets this job produces.
    fn output(&self) -> Outputs {
        Outputs::Empty
    }

    fn run(&mut self, ctx: &mut RunContext<'_>) -> JobResult<()>;

    fn on_success(&mut self, ctx: &mut RunContext<'_>) -> JobResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once when configure, run, the output postcondition or `on_success` fails.
    ///
    /// The default removes every declared output, each independently. Errors
    /// raised while cleaning are logged; they never replace `error`.
    fn on_failure(&mut self, ctx: &mut RunContext<'_>, error: &JobError) {
        let _ = (ctx, error);
        clean_up_all(&self.output().flatten());
    }

    /// Informational only; the lifecycle decides completion from `output()`.
    fn is_complete(&self) -> bool {
        false
    }
}

/// What `configure()` can see.
pub struct ConfigureContext<'a> {
    props: &'a mut PropertyContext,
    fields: &'a Fields,
}

impl<'a> ConfigureContext<'a> {
    pub(crate) fn new(props: &'a mut PropertyContext, fields: &'a Fields) -> Self {
        Self { props, fields }
    }

    pub fn props(&self) -> &PropertyContext {
        &*self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertyContext {
        &mut *self.props
    }

    pub fn fields(&self) -> &Fields {
        self.fields
    }
}

/// What `run()` and the outcome hooks can see.
pub struct RunContext<'a> {
    job: &'a str,
    props: &'a mut PropertyContext,
    fields: &'a Fields,
    requirement: &'a Requirement,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        job: &'a str,
        props: &'a mut PropertyContext,
        fields: &'a Fields,
        requirement: &'a Requirement,
    ) -> Self {
        Self {
            job,
            props,
            fields,
            requirement,
        }
    }

    pub fn job_name(&self) -> &str {
        self.job
    }

    pub fn props(&self) -> &PropertyContext {
        &*self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertyContext {
        &mut *self.props
    }

    pub fn fields(&self) -> &Fields {
        self.fields
    }

    /// Outputs of the required jobs, shaped like `requires()`.
    pub fn input(&mut self) -> JobResult<Inputs> {
        self.requirement.resolve(&mut *self.props)
    }

    /// Path inside the run's data directory.
    pub fn data_path(&self, rel: &str) -> JobResult<PathBuf> {
        self.props
            .data_path(rel)
            .ok_or_else(|| JobError::Other(anyhow!("data directory not set (no working.dir)")))
    }

    /// Remove the run's data directory and everything in it.
    pub fn clear_data_dir(&self) -> JobResult<()> {
        let Some(dir) = self.props.data_dir() else {
            return Ok(());
        };
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(JobError::Other(
                anyhow::Error::new(e).context(format!("clearing {}", dir.display())),
            )),
        }
    }
}

//! Execution lifecycle of a single job instance.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use nagini_core::target::{all_exist, missing};
use nagini_core::{Environment, JobError, JobResult, PropertyContext, PropertyStore};

use crate::handle::JobRef;
use crate::job::Job;
use crate::types::{JobReport, JobState};

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Directory created under `working.dir` for job data
    pub data_dir_name: String,
    /// Create the data directory before binding
    pub create_data_dir: bool,
    /// Export the injected environment as `env.*` properties
    pub export_environment: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            data_dir_name: "nagini_data".to_string(),
            create_data_dir: true,
            export_environment: true,
        }
    }
}

impl RunnerConfig {
    pub fn with_data_dir_name(mut self, name: impl Into<String>) -> Self {
        self.data_dir_name = name.into();
        self
    }

    pub fn with_create_data_dir(mut self, create: bool) -> Self {
        self.create_data_dir = create;
        self
    }

    pub fn with_export_environment(mut self, export: bool) -> Self {
        self.export_environment = export;
        self
    }
}

/// Drives one job instance from `execute()` to completion.
///
/// Synchronous and single-threaded. No retries: failures go back to the caller
/// (the external orchestrator) with the original error.
pub struct JobRunner<S: PropertyStore> {
    store: S,
    env: Environment,
    config: RunnerConfig,
}

impl<S: PropertyStore> JobRunner<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            env: Environment::empty(),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Wrap `job` in a fresh handle and execute it.
    pub fn execute_job(&self, job: impl Job + 'static) -> JobResult<JobReport> {
        self.execute(&JobRef::new(job))
    }

    /// Execute a job instance.
    ///
    /// Binding failures abort before `configure()` without calling `on_failure()`.
    /// Every later failure calls `on_failure()` and is then returned unchanged.
    /// A store error while saving after success marks the job `Failed` and is
    /// returned as `Store`; `on_failure()` is not called since the outputs are complete.
    pub fn execute(&self, job: &JobRef) -> JobResult<JobReport> {
        let started_at = Utc::now();
        let name = job.name().to_string();

        let mut props = self.store.load()?;
        self.prepare_data_dir(&mut props);

        info!(job = %name, "binding fields");
        if let Err(e) = job.bind(&props) {
            error!(job = %name, error = %e, "field binding failed");
            return Err(e);
        }

        match self.drive(job, &mut props) {
            Ok(skipped) => {
                job.set_state(JobState::Succeeded);
                self.write_back(job, &mut props);
                if let Err(e) = self.store.save(&props) {
                    job.set_state(JobState::Failed);
                    error!(job = %name, error = %e, "failed to save properties after success");
                    return Err(e.into());
                }
                let report = JobReport::new(name, skipped, started_at);
                info!(job = %report.job, skipped, duration_ms = report.duration_ms, "job succeeded");
                Ok(report)
            }
            Err(e) => {
                error!(job = %name, error = %e, "job failed, calling on_failure");
                job.fail(&mut props, &e);
                self.write_back(job, &mut props);
                if let Err(save_err) = self.store.save(&props) {
                    warn!(job = %name, error = %save_err, "failed to save properties after failure");
                }
                Err(e)
            }
        }
    }

    /// Configure, pre-check, run, post-check and `on_success`. Returns whether the run was skipped.
    fn drive(&self, job: &JobRef, props: &mut PropertyContext) -> JobResult<bool> {
        job.configure(props)?;
        debug!(
            job = %job.name(),
            props = %serde_json::to_string(&*props).unwrap_or_default(),
            "configured"
        );

        let targets = job.output().flatten();
        let check_outputs = !targets.is_empty();

        let skipped = if check_outputs && all_exist(&targets) {
            warn!(job = %job.name(), "all targets exist at start of the job, skipping run");
            job.set_state(JobState::Skipped);
            true
        } else {
            info!(job = %job.name(), "running");
            job.set_state(JobState::Running);
            job.with_run_context(props, |job, ctx| job.run(ctx))?;
            false
        };

        if check_outputs && !skipped {
            let missing = missing(&targets);
            if !missing.is_empty() {
                return Err(JobError::incomplete_output(missing));
            }
        }

        job.with_run_context(props, |job, ctx| job.on_success(ctx))?;
        Ok(skipped)
    }

    fn prepare_data_dir(&self, props: &mut PropertyContext) {
        let Some(dir) = props.derive_data_dir(&self.config.data_dir_name) else {
            return;
        };
        if self.config.create_data_dir {
            create_dir(&dir);
        }
    }

    fn write_back(&self, job: &JobRef, props: &mut PropertyContext) {
        if self.config.export_environment {
            self.env.export_into(props);
        }
        if job.state() == JobState::Succeeded {
            if let Some(fields) = job.fields() {
                fields.write_back(props);
            }
        }
    }
}

fn create_dir(dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "could not create data directory");
    }
}

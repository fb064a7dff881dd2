//! Shared job handles.
//!
//! A [`JobRef`] owns one job instance together with its lifecycle state, its bound
//! fields and its memoized requirement. Cloning the handle shares the instance, so a
//! job required from two places (a diamond) is bound and configured once.
//!
//! Handles are single-threaded (`Rc`); a lifecycle never leaves the thread that
//! started it.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use nagini_core::{Fields, JobError, JobResult, Outputs, PropertyContext};

use crate::job::{ConfigureContext, Job, RunContext};
use crate::resolve::Requirement;
use crate::types::JobState;

struct JobNode {
    name: String,
    job: RefCell<Box<dyn Job>>,
    state: Cell<JobState>,
    fields: RefCell<Option<Fields>>,
    requirement: OnceCell<Requirement>,
    configuring: Cell<bool>,
}

/// Shared handle to one job instance.
#[derive(Clone)]
pub struct JobRef(Rc<JobNode>);

impl JobRef {
    pub fn new(job: impl Job + 'static) -> Self {
        let name = job.definition().name().to_string();
        Self(Rc::new(JobNode {
            name,
            job: RefCell::new(Box::new(job)),
            state: Cell::new(JobState::Created),
            fields: RefCell::new(None),
            requirement: OnceCell::new(),
            configuring: Cell::new(false),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn state(&self) -> JobState {
        self.0.state.get()
    }

    /// Whether two handles point at the same instance.
    pub fn ptr_eq(&self, other: &JobRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Bound field values, once binding happened.
    pub fn fields(&self) -> Option<Fields> {
        self.0.fields.borrow().clone()
    }

    pub fn output(&self) -> Outputs {
        self.0.job.borrow().output()
    }

    pub fn is_complete(&self) -> bool {
        self.0.job.borrow().is_complete()
    }

    pub fn retries(&self) -> u32 {
        self.0.job.borrow().definition().retries()
    }

    /// The job's requirement, evaluated on first access and memoized.
    pub fn requires(&self) -> JobResult<&Requirement> {
        if let Some(requirement) = self.0.requirement.get() {
            return Ok(requirement);
        }

        let requirement = self
            .0
            .job
            .try_borrow()
            .map_err(|_| JobError::DependencyCycle(self.0.name.clone()))?
            .requires();
        requirement.validate()?;

        Ok(self.0.requirement.get_or_init(|| requirement))
    }

    /// Bind fields from `props`. No-op once bound.
    pub fn bind(&self, props: &PropertyContext) -> JobResult<()> {
        if self.state() != JobState::Created {
            return Ok(());
        }

        let fields = self.0.job.borrow().definition().fields().bind(props)?;
        *self.0.fields.borrow_mut() = Some(fields);
        self.0.state.set(JobState::FieldsBound);
        debug!(job = %self.0.name, "fields bound");
        Ok(())
    }

    /// Bind (if needed), run `configure()`, then configure every required job.
    ///
    /// Each instance is configured at most once; required jobs are never run.
    /// Reaching an instance again while its own dependencies are still being
    /// configured is reported as a cycle.
    pub fn configure(&self, props: &mut PropertyContext) -> JobResult<()> {
        if self.state().is_configured() {
            return Ok(());
        }
        if self.0.configuring.replace(true) {
            return Err(JobError::DependencyCycle(self.0.name.clone()));
        }

        let result = self.configure_inner(props);
        self.0.configuring.set(false);
        result
    }

    fn configure_inner(&self, props: &mut PropertyContext) -> JobResult<()> {
        self.bind(props)?;

        {
            let fields = self.0.fields.borrow();
            let empty = Fields::default();
            let fields = fields.as_ref().unwrap_or(&empty);
            let mut ctx = ConfigureContext::new(props, fields);
            self.0.job.borrow_mut().configure(&mut ctx)?;
        }

        let requirement = self.requires()?;
        for upstream in requirement.jobs() {
            debug!(job = %self.0.name, upstream = %upstream.name(), "configuring dependency");
            upstream.configure(props)?;
        }

        self.0.state.set(JobState::Configured);
        Ok(())
    }

    pub(crate) fn set_state(&self, state: JobState) {
        self.0.state.set(state);
    }

    /// Call a run-phase hook with a context built from this handle.
    pub(crate) fn with_run_context<T>(
        &self,
        props: &mut PropertyContext,
        hook: impl FnOnce(&mut dyn Job, &mut RunContext<'_>) -> JobResult<T>,
    ) -> JobResult<T> {
        let requirement = self.requires()?;
        let fields = self.0.fields.borrow();
        let empty = Fields::default();
        let fields = fields.as_ref().unwrap_or(&empty);
        let mut ctx = RunContext::new(&self.0.name, props, fields, requirement);
        let mut job = self.0.job.borrow_mut();
        hook(job.as_mut(), &mut ctx)
    }

    /// Invoke `on_failure`, never letting it replace `error`.
    pub(crate) fn fail(&self, props: &mut PropertyContext, error: &JobError) {
        self.0.state.set(JobState::Failed);
        let empty_requirement = Requirement::None;
        let requirement = self.0.requirement.get().unwrap_or(&empty_requirement);
        let fields = self.0.fields.borrow();
        let empty = Fields::default();
        let fields = fields.as_ref().unwrap_or(&empty);
        let mut ctx = RunContext::new(&self.0.name, props, fields, requirement);

        match self.0.job.try_borrow_mut() {
            Ok(mut job) => job.on_failure(&mut ctx, error),
            Err(_) => warn!(job = %self.0.name, "job busy, on_failure skipped"),
        }
    }
}

impl fmt::Debug for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRef")
            .field("name", &self.0.name)
            .field("state", &self.0.state.get())
            .finish()
    }
}

//! Flow handles: fire-and-forget triggers on the external orchestrator.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use nagini_core::FlowError;

use crate::definition::JobDefinition;

/// Parameters passed to a triggered flow.
pub type FlowParams = BTreeMap<String, String>;

/// Opaque execution identifier returned by the orchestrator. Not tracked further.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the orchestrator does when the flow is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentOption {
    /// Start another execution regardless
    Ignore,
    /// Do not start a new execution
    #[default]
    Skip,
    /// Start a new execution pipelined behind the running one
    Pipeline,
    /// Queue the execution until the running one finishes
    Queue,
}

impl ConcurrentOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrentOption::Ignore => "ignore",
            ConcurrentOption::Skip => "skip",
            ConcurrentOption::Pipeline => "pipeline",
            ConcurrentOption::Queue => "queue",
        }
    }
}

impl fmt::Display for ConcurrentOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client of the external orchestrator. Session management is the client's business.
pub trait Orchestrator: Send + Sync {
    fn trigger(
        &self,
        project: &str,
        flow: &str,
        params: &FlowParams,
        concurrent_option: ConcurrentOption,
    ) -> Result<ExecutionId, FlowError>;
}

impl<O: Orchestrator + ?Sized> Orchestrator for Arc<O> {
    fn trigger(
        &self,
        project: &str,
        flow: &str,
        params: &FlowParams,
        concurrent_option: ConcurrentOption,
    ) -> Result<ExecutionId, FlowError> {
        (**self).trigger(project, flow, params, concurrent_option)
    }
}

/// A named flow of one project on the orchestrator.
#[derive(Clone)]
pub struct FlowHandle {
    project: String,
    name: String,
    concurrent_option: ConcurrentOption,
    orchestrator: Arc<dyn Orchestrator>,
}

impl FlowHandle {
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            concurrent_option: ConcurrentOption::default(),
            orchestrator,
        }
    }

    /// Handle for the flow named after a job definition.
    pub fn for_job(
        project: impl Into<String>,
        definition: &JobDefinition,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Self {
        Self::new(project, definition.name(), orchestrator)
    }

    pub fn with_concurrent_option(mut self, option: ConcurrentOption) -> Self {
        self.concurrent_option = option;
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn concurrent_option(&self) -> ConcurrentOption {
        self.concurrent_option
    }

    /// Trigger one execution with `params`.
    pub fn start(&self, params: &FlowParams) -> Result<ExecutionId, FlowError> {
        let id = self
            .orchestrator
            .trigger(&self.project, &self.name, params, self.concurrent_option)?;
        info!(
            project = %self.project,
            flow = %self.name,
            execution_id = %id,
            "flow triggered"
        );
        Ok(id)
    }
}

impl fmt::Debug for FlowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowHandle")
            .field("project", &self.project)
            .field("name", &self.name)
            .field("concurrent_option", &self.concurrent_option)
            .finish()
    }
}

//! Recording orchestrator for tests/dev.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use nagini_core::FlowError;
use nagini_jobs::{ConcurrentOption, ExecutionId, FlowParams, Orchestrator};

/// One recorded trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredFlow {
    pub project: String,
    pub flow: String,
    pub params: FlowParams,
    pub concurrent_option: ConcurrentOption,
    pub execution_id: ExecutionId,
}

#[derive(Debug, Default)]
struct State {
    triggers: Vec<TriggeredFlow>,
    reject_next: Option<String>,
}

/// Orchestrator that accepts every trigger and remembers it.
#[derive(Debug, Default)]
pub struct InMemoryOrchestrator {
    state: Mutex<State>,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Every accepted trigger, oldest first.
    pub fn triggers(&self) -> Vec<TriggeredFlow> {
        self.state
            .lock()
            .map(|state| state.triggers.clone())
            .unwrap_or_default()
    }

    /// Accepted triggers of one flow.
    pub fn triggers_of(&self, flow: &str) -> Vec<TriggeredFlow> {
        self.triggers()
            .into_iter()
            .filter(|t| t.flow == flow)
            .collect()
    }

    /// Reject the next trigger with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.reject_next = Some(reason.into());
        }
    }
}

impl Orchestrator for InMemoryOrchestrator {
    fn trigger(
        &self,
        project: &str,
        flow: &str,
        params: &FlowParams,
        concurrent_option: ConcurrentOption,
    ) -> Result<ExecutionId, FlowError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| FlowError::Unavailable("orchestrator state poisoned".into()))?;

        if let Some(reason) = state.reject_next.take() {
            warn!(project, flow, %reason, "trigger rejected");
            return Err(FlowError::Rejected {
                flow: flow.to_string(),
                reason,
            });
        }

        let execution_id = ExecutionId::new(Uuid::now_v7().to_string());
        debug!(project, flow, execution_id = %execution_id, "trigger recorded");
        state.triggers.push(TriggeredFlow {
            project: project.to_string(),
            flow: flow.to_string(),
            params: params.clone(),
            concurrent_option,
            execution_id: execution_id.clone(),
        });
        Ok(execution_id)
    }
}

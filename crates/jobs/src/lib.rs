//! Job lifecycle: definitions, dependency resolution, execution and flow triggers.
//!
//! Jobs declare fields, dependencies and outputs through the [`Job`] trait; the
//! [`JobRunner`] binds them from the property context, configures the dependency
//! graph, skips work whose outputs already exist and enforces the output
//! postcondition. [`FlowHandle`] triggers named flows on an external orchestrator.

pub mod definition;
pub mod flow;
pub mod handle;
pub mod housekeeping;
pub mod job;
pub mod resolve;
pub mod runner;
pub mod types;

pub use definition::{FieldSpec, JobDefinition, JobDefinitionBuilder, JobMetadata};
pub use flow::{ConcurrentOption, ExecutionId, FlowHandle, FlowParams, Orchestrator};
pub use handle::JobRef;
pub use housekeeping::ClearDataDir;
pub use job::{ConfigureContext, Job, RunContext};
pub use resolve::{Inputs, Requirement};
pub use runner::{JobRunner, RunnerConfig};
pub use types::{JobReport, JobState};

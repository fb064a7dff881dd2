//! Infrastructure adapters: property stores, orchestrator client doubles, config.

pub mod config;
pub mod orchestrator;
pub mod store;

pub use config::RunnerSettings;
pub use orchestrator::{InMemoryOrchestrator, TriggeredFlow};
pub use store::{InMemoryPropertyStore, JsonFilePropertyStore};

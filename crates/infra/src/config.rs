//! Runner settings loaded from the process environment.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nagini_core::PropertyStore;
use nagini_jobs::RunnerConfig;

use crate::store::{InMemoryPropertyStore, JsonFilePropertyStore};

pub const DATA_DIR_NAME_VAR: &str = "NAGINI_DATA_DIR_NAME";
pub const CREATE_DATA_DIR_VAR: &str = "NAGINI_CREATE_DATA_DIR";
pub const EXPORT_ENV_VAR: &str = "NAGINI_EXPORT_ENV";
pub const STATE_FILE_VAR: &str = "NAGINI_STATE_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub data_dir_name: String,
    pub create_data_dir: bool,
    pub export_environment: bool,
    /// Property file for [`JsonFilePropertyStore`](crate::JsonFilePropertyStore); in-memory when unset.
    pub state_file: Option<PathBuf>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        let runner = RunnerConfig::default();
        Self {
            data_dir_name: runner.data_dir_name,
            create_data_dir: runner.create_data_dir,
            export_environment: runner.export_environment,
            state_file: None,
        }
    }
}

impl RunnerSettings {
    /// Read settings from `NAGINI_*` variables. Unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let data_dir_name = match lookup(DATA_DIR_NAME_VAR) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => {
                tracing::warn!("{DATA_DIR_NAME_VAR} is empty; using {}", defaults.data_dir_name);
                defaults.data_dir_name
            }
            None => defaults.data_dir_name,
        };

        Self {
            data_dir_name,
            create_data_dir: flag(&lookup, CREATE_DATA_DIR_VAR, defaults.create_data_dir),
            export_environment: flag(&lookup, EXPORT_ENV_VAR, defaults.export_environment),
            state_file: lookup(STATE_FILE_VAR)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// JSON file store at `state_file` when set, otherwise an empty in-memory store.
    pub fn property_store(&self) -> Arc<dyn PropertyStore + Send + Sync> {
        match &self.state_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using JSON property file");
                Arc::new(JsonFilePropertyStore::new(path))
            }
            None => Arc::new(InMemoryPropertyStore::new()),
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::default()
            .with_data_dir_name(self.data_dir_name.clone())
            .with_create_data_dir(self.create_data_dir)
            .with_export_environment(self.export_environment)
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => {
            tracing::warn!("{key}={raw:?} is not a boolean; using {default}");
            default
        }
    }
}

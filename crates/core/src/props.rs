//! Property context: the run's external key/value state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Key holding the working directory assigned by the orchestrator.
pub const WORKING_DIR: &str = "working.dir";

/// Key holding the job-layer data directory derived from [`WORKING_DIR`].
pub const DATA_DIR: &str = "working.dir.nagini";

/// Prefix under which environment variables are exported.
pub const ENV_PREFIX: &str = "env.";

/// String-keyed state of one run.
///
/// Loaded from the property store before field binding, mutated by the job while it
/// executes and saved back afterwards. Key order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyContext {
    values: BTreeMap<String, String>,
}

impl PropertyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Insert or replace a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into this context without overriding keys already present.
    pub fn merge_missing(&mut self, other: PropertyContext) {
        for (key, value) in other.values {
            self.values.entry(key).or_insert(value);
        }
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        self.get(WORKING_DIR).map(PathBuf::from)
    }

    /// Data directory of the run, if it has been derived.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.get(DATA_DIR).map(PathBuf::from)
    }

    /// Derive [`DATA_DIR`] as `<working.dir>/<dir_name>`.
    ///
    /// Returns the derived path, or `None` when no working directory is set.
    pub fn derive_data_dir(&mut self, dir_name: &str) -> Option<PathBuf> {
        let path = self.working_dir()?.join(dir_name);
        self.set(DATA_DIR, path.to_string_lossy().into_owned());
        Some(path)
    }

    /// Path relative to the data directory.
    pub fn data_path(&self, rel: &str) -> Option<PathBuf> {
        self.data_dir().map(|dir| dir.join(rel))
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

//! Property store implementations.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::debug;

use nagini_core::{PropertyContext, PropertyStore, StoreError};

/// In-memory property store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPropertyStore {
    props: RwLock<PropertyContext>,
    saves: RwLock<usize>,
}

impl InMemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_properties<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            props: RwLock::new(pairs.into_iter().collect()),
            saves: RwLock::new(0),
        }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Result<PropertyContext, StoreError> {
        self.props
            .read()
            .map(|props| props.clone())
            .map_err(|_| poisoned())
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.read().map(|n| *n).unwrap_or_default()
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn load(&self) -> Result<PropertyContext, StoreError> {
        self.snapshot()
    }

    fn save(&self, props: &PropertyContext) -> Result<(), StoreError> {
        *self.props.write().map_err(|_| poisoned())? = props.clone();
        *self.saves.write().map_err(|_| poisoned())? += 1;
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("property store lock poisoned".into())
}

/// Property store backed by a JSON object file.
///
/// A missing file loads as an empty context.
#[derive(Debug, Clone)]
pub struct JsonFilePropertyStore {
    path: PathBuf,
}

impl JsonFilePropertyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl PropertyStore for JsonFilePropertyStore {
    fn load(&self) -> Result<PropertyContext, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no property file, starting empty");
                return Ok(PropertyContext::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, props: &PropertyContext) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(props)?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), keys = props.len(), "properties saved");
        Ok(())
    }
}

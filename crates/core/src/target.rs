//! Durable outputs and the shapes jobs declare them in.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::error::TargetError;

/// A named, checkable unit of output.
///
/// `exists` must be free of side effects and may be called any number of times.
/// `clean_up` is best effort and must succeed on a target that does not exist.
/// Other processes may create or delete the same target concurrently; nothing here
/// assumes exclusive access.
pub trait Target: fmt::Debug + Send + Sync {
    /// Human-readable identity used in logs and errors.
    fn id(&self) -> String;

    fn exists(&self) -> bool;

    fn clean_up(&self) -> Result<(), TargetError>;
}

/// A file or directory on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    path: PathBuf,
}

impl LocalTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Target for LocalTarget {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn clean_up(&self) -> Result<(), TargetError> {
        let result = if self.path.is_dir() {
            std::fs::remove_dir_all(&self.path)
        } else {
            std::fs::remove_file(&self.path)
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TargetError::Io {
                target: self.id(),
                source,
            }),
        }
    }
}

/// Outputs declared by a job: nothing, one target, or a nested structure of targets.
#[derive(Debug, Clone, Default)]
pub enum Outputs {
    #[default]
    Empty,
    Single(Arc<dyn Target>),
    Ordered(Vec<Outputs>),
    Keyed(BTreeMap<String, Outputs>),
}

impl Outputs {
    pub fn single(target: impl Target + 'static) -> Self {
        Self::Single(Arc::new(target))
    }

    /// Ordered list of single targets.
    pub fn list<T, I>(targets: I) -> Self
    where
        T: Target + 'static,
        I: IntoIterator<Item = T>,
    {
        Self::Ordered(targets.into_iter().map(Outputs::single).collect())
    }

    pub fn keyed<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Outputs)>,
    {
        Self::Keyed(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The target of a `Single` output.
    pub fn as_single(&self) -> Option<&Arc<dyn Target>> {
        match self {
            Outputs::Single(target) => Some(target),
            _ => None,
        }
    }

    /// Flatten into a uniform sequence, depth first, in declaration (or key) order.
    pub fn flatten(&self) -> Vec<Arc<dyn Target>> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Arc<dyn Target>>) {
        match self {
            Outputs::Empty => {}
            Outputs::Single(target) => out.push(Arc::clone(target)),
            Outputs::Ordered(items) => items.iter().for_each(|item| item.flatten_into(out)),
            Outputs::Keyed(items) => items.values().for_each(|item| item.flatten_into(out)),
        }
    }

    /// True when the flattened output set has no target.
    pub fn is_empty(&self) -> bool {
        match self {
            Outputs::Empty => true,
            Outputs::Single(_) => false,
            Outputs::Ordered(items) => items.iter().all(Outputs::is_empty),
            Outputs::Keyed(items) => items.values().all(Outputs::is_empty),
        }
    }
}

/// Ids of the targets that do not exist.
pub fn missing(targets: &[Arc<dyn Target>]) -> Vec<String> {
    targets
        .iter()
        .filter(|t| !t.exists())
        .map(|t| t.id())
        .collect()
}

pub fn all_exist(targets: &[Arc<dyn Target>]) -> bool {
    targets.iter().all(|t| t.exists())
}

/// Clean every target independently; one failure does not stop the others.
///
/// Returns the failures (already logged).
pub fn clean_up_all(targets: &[Arc<dyn Target>]) -> Vec<(String, TargetError)> {
    let mut failures = Vec::new();
    for target in targets {
        if let Err(e) = target.clean_up() {
            warn!(target = %target.id(), error = %e, "target clean-up failed");
            failures.push((target.id(), e));
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named(&'static str, bool);

    impl Target for Named {
        fn id(&self) -> String {
            self.0.to_string()
        }

        fn exists(&self) -> bool {
            self.1
        }

        fn clean_up(&self) -> Result<(), TargetError> {
            if self.0 == "broken" {
                Err(TargetError::other(self.0, "permission denied"))
            } else {
                Ok(())
            }
        }
    }

    fn ids(targets: &[Arc<dyn Target>]) -> Vec<String> {
        targets.iter().map(|t| t.id()).collect()
    }

    #[test]
    fn flatten_nested_structure_in_order() {
        let outputs = Outputs::Ordered(vec![
            Outputs::single(Named("a", true)),
            Outputs::keyed([
                ("z", Outputs::single(Named("z", true))),
                ("m", Outputs::list([Named("m1", true), Named("m2", false)])),
            ]),
            Outputs::Empty,
        ]);

        assert_eq!(ids(&outputs.flatten()), vec!["a", "m1", "m2", "z"]);
        assert!(!outputs.is_empty());
        assert_eq!(missing(&outputs.flatten()), vec!["m2"]);
        assert!(!all_exist(&outputs.flatten()));
    }

    #[test]
    fn nested_empty_structures_are_empty() {
        let outputs = Outputs::Ordered(vec![Outputs::Empty, Outputs::keyed([("x", Outputs::Empty)])]);
        assert!(outputs.is_empty());
        assert!(outputs.flatten().is_empty());
    }

    #[test]
    fn clean_up_continues_after_failure() {
        let targets = Outputs::list([Named("broken", true), Named("ok", true)]).flatten();

        let failures = clean_up_all(&targets);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "broken");
    }

    #[test]
    fn local_target_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let file = LocalTarget::new(dir.path().join("part-0.tsv"));
        let nested = LocalTarget::new(dir.path().join("nested"));

        assert!(!file.exists());
        file.clean_up().unwrap();

        std::fs::write(file.path(), b"1\t2\n").unwrap();
        std::fs::create_dir_all(nested.path().join("deep")).unwrap();
        assert!(file.exists());
        assert!(nested.exists());

        file.clean_up().unwrap();
        nested.clean_up().unwrap();
        assert!(!file.exists());
        assert!(!nested.exists());
    }
}

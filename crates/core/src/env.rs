//! Explicit snapshot of the process environment.

use std::collections::BTreeMap;

use crate::props::{ENV_PREFIX, PropertyContext};

/// Environment variables handed to a run.
///
/// Jobs never read `std::env` directly; the runner receives one of these and
/// exports it into the property context as `env.<KEY>` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Empty environment (nothing is exported).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Write every variable into `props` as `env.<KEY>`.
    pub fn export_into(&self, props: &mut PropertyContext) {
        for (key, value) in &self.vars {
            props.set(format!("{ENV_PREFIX}{key}"), value.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_prefixes_keys() {
        let env: Environment = [("HOME", "/home/etl"), ("LANG", "C")].into_iter().collect();
        let mut props = PropertyContext::new();

        env.export_into(&mut props);

        assert_eq!(props.get("env.HOME"), Some("/home/etl"));
        assert_eq!(props.get("env.LANG"), Some("C"));
        assert_eq!(props.len(), 2);
    }
}

//! Error model shared by every job-layer crate.

use thiserror::Error;

/// Result type used across the job layer.
pub type JobResult<T> = Result<T, JobError>;

/// Failure surfaced by the job lifecycle.
///
/// Variants are grouped by when they can happen:
///
/// - **Definition time**: `DuplicateFieldName`, `InvalidRequirement`, `DependencyCycle`
/// - **Binding**: `MissingProperty`, `FieldConversion`
/// - **Postcondition**: `IncompleteOutput`
/// - **Execution**: anything raised by user hooks (`Other`) or by collaborators
///   (`Store`, `Target`, `Flow`)
///
/// The lifecycle never rewraps an error raised by a hook: the value returned by
/// `configure()` / `run()` is the value the caller gets back.
#[derive(Debug, Error)]
pub enum JobError {
    /// Two fields of one definition resolve to the same effective name.
    #[error("duplicate field name: {0}")]
    DuplicateFieldName(String),

    /// `requires()` produced a shape the resolver cannot turn into inputs.
    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),

    /// A job was reached again while its own dependencies were being configured.
    #[error("dependency cycle detected at job {0}")]
    DependencyCycle(String),

    /// A required field has no matching key in the property context.
    #[error("property \"{0}\" not set in props (required)")]
    MissingProperty(String),

    /// A raw property value could not be converted to the field's type.
    #[error("field {field}: cannot convert {value:?}: {reason}")]
    FieldConversion {
        field: String,
        value: String,
        reason: String,
    },

    /// `run()` returned but some declared outputs do not exist.
    #[error("not all output targets exist at end of the job (missing: {})", .missing.join(", "))]
    IncompleteOutput { missing: Vec<String> },

    #[error("property store: {0}")]
    Store(#[from] StoreError),

    #[error("target: {0}")]
    Target(#[from] TargetError),

    #[error("flow: {0}")]
    Flow(#[from] FlowError),

    /// Failure raised by job code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobError {
    pub fn duplicate_field(name: impl Into<String>) -> Self {
        Self::DuplicateFieldName(name.into())
    }

    pub fn invalid_requirement(msg: impl Into<String>) -> Self {
        Self::InvalidRequirement(msg.into())
    }

    pub fn missing_property(name: impl Into<String>) -> Self {
        Self::MissingProperty(name.into())
    }

    pub fn conversion(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FieldConversion {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn incomplete_output(missing: Vec<String>) -> Self {
        Self::IncompleteOutput { missing }
    }

    /// Errors that make a job unusable before it ever reaches `run()`.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            JobError::DuplicateFieldName(_)
                | JobError::InvalidRequirement(_)
                | JobError::DependencyCycle(_)
        )
    }

    pub fn is_binding_error(&self) -> bool {
        matches!(
            self,
            JobError::MissingProperty(_) | JobError::FieldConversion { .. }
        )
    }
}

/// Property store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Target existence / cleanup error.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("io error on {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{target}: {reason}")]
    Other { target: String, reason: String },
}

impl TargetError {
    pub fn other(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Other {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Orchestrator trigger error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("flow {flow} rejected: {reason}")]
    Rejected { flow: String, reason: String },
    #[error("orchestrator unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_output_lists_missing_targets() {
        let err = JobError::incomplete_output(vec!["a.tsv".into(), "b.tsv".into()]);
        assert_eq!(
            err.to_string(),
            "not all output targets exist at end of the job (missing: a.tsv, b.tsv)"
        );
    }

    #[test]
    fn hook_errors_are_transparent() {
        let err: JobError = anyhow::anyhow!("mysql exited with 1").into();
        assert_eq!(err.to_string(), "mysql exited with 1");
        assert!(!err.is_definition_error());
        assert!(!err.is_binding_error());
    }

    #[test]
    fn missing_property_names_the_key() {
        let err = JobError::missing_property("db.table");
        assert!(err.is_binding_error());
        assert!(err.to_string().contains("\"db.table\""));
    }
}

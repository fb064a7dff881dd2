//! Type-level job metadata: identity, retry hints and declared fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use nagini_core::{Field, FieldSet, JobResult};

/// Metadata shared by every instance of one job type.
///
/// Build it once per job type (a `static LazyLock`, or at startup) so a field
/// name collision is reported before any instance is created.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    name: String,
    retries: u32,
    retry_backoff: Duration,
    fields: FieldSet,
}

impl JobDefinition {
    pub fn builder(name: impl Into<String>) -> JobDefinitionBuilder {
        JobDefinitionBuilder {
            name: name.into(),
            retries: 0,
            retry_backoff: Duration::ZERO,
            parent: None,
            fields: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Builder named after the implementing type (`my_crate::jobs::Export<T>` → `Export`).
    pub fn for_type<T: ?Sized>() -> JobDefinitionBuilder {
        Self::builder(short_type_name(std::any::type_name::<T>()))
    }

    /// Flow name used when triggering this job on the orchestrator.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Retry hint for the external executor; not enforced here.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Backoff hint for the external executor; not enforced here.
    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn metadata(&self) -> JobMetadata {
        JobMetadata {
            name: self.name.clone(),
            retries: self.retries,
            retry_backoff_secs: self.retry_backoff.as_secs(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldSpec {
                    name: f.name().to_string(),
                    kind: f.kind().label().to_string(),
                    required: f.is_required(),
                    default: f.default_raw().map(str::to_string),
                })
                .collect(),
        }
    }
}

pub struct JobDefinitionBuilder {
    name: String,
    retries: u32,
    retry_backoff: Duration,
    parent: Option<FieldSet>,
    fields: Vec<Field>,
    overrides: Vec<Field>,
}

impl JobDefinitionBuilder {
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Inherit the fields and retry hints of a parent job type.
    pub fn extends(mut self, parent: &JobDefinition) -> Self {
        self.parent = Some(parent.fields.clone());
        self.retries = parent.retries;
        self.retry_backoff = parent.retry_backoff;
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Replace an inherited field on purpose.
    pub fn override_field(mut self, field: Field) -> Self {
        self.overrides.push(field);
        self
    }

    /// Fails with `DuplicateFieldName` when two fields share an effective name.
    pub fn build(self) -> JobResult<JobDefinition> {
        let mut builder = FieldSet::builder();
        if let Some(parent) = &self.parent {
            builder = builder.inherit(parent);
        }
        for field in self.overrides {
            builder = builder.override_field(field);
        }
        for field in self.fields {
            builder = builder.field(field);
        }

        Ok(JobDefinition {
            name: self.name,
            retries: self.retries,
            retry_backoff: self.retry_backoff,
            fields: builder.build()?,
        })
    }
}

/// Serializable view of a definition for the external scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub name: String,
    pub retries: u32,
    pub retry_backoff_secs: u64,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: String,
    pub required: bool,
    pub default: Option<String>,
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nagini_core::JobError;

    struct ExportOrders;
    struct Wrapper<T>(T);

    #[test]
    fn default_name_is_the_type_name() {
        let def = JobDefinition::for_type::<ExportOrders>().build().unwrap();
        assert_eq!(def.name(), "ExportOrders");

        let def = JobDefinition::for_type::<Wrapper<ExportOrders>>().build().unwrap();
        assert_eq!(def.name(), "Wrapper");
    }

    #[test]
    fn child_definition_inherits_fields_and_hints() {
        let base = JobDefinition::builder("mysql_base")
            .retries(3)
            .retry_backoff(Duration::from_secs(60))
            .field(Field::text("host").required())
            .field(Field::integer("port").default_value("3306"))
            .build()
            .unwrap();

        let child = JobDefinition::builder("load_orders")
            .extends(&base)
            .field(Field::text("table").required())
            .build()
            .unwrap();

        assert_eq!(child.retries(), 3);
        assert_eq!(child.retry_backoff(), Duration::from_secs(60));
        assert_eq!(child.fields().len(), 3);
    }

    #[test]
    fn collision_with_parent_fails_before_any_instance() {
        let base = JobDefinition::builder("base")
            .field(Field::text("table"))
            .build()
            .unwrap();

        let result = JobDefinition::builder("child")
            .extends(&base)
            .field(Field::text("table"))
            .build();

        assert!(matches!(result, Err(JobError::DuplicateFieldName(name)) if name == "table"));
    }

    #[test]
    fn metadata_describes_fields() {
        let def = JobDefinition::builder("load")
            .retries(2)
            .retry_backoff(Duration::from_secs(30))
            .field(Field::integer("port").default_value("3306"))
            .build()
            .unwrap();

        let meta = def.metadata();
        assert_eq!(meta.retries, 2);
        assert_eq!(meta.retry_backoff_secs, 30);
        assert_eq!(
            meta.fields,
            vec![FieldSpec {
                name: "port".into(),
                kind: "integer".into(),
                required: false,
                default: Some("3306".into()),
            }]
        );
    }
}

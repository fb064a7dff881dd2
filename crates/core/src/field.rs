//! Declarative, typed job fields bound from the property context.
//!
//! A job type declares its fields once, through [`FieldSet::builder`]. The builder
//! merges the fields of a parent set (the job type it extends) with the fields the
//! job adds, and rejects two fields resolving to the same effective name. Because
//! the set is built when the job *type* is defined, a collision fails before any
//! job instance exists.
//!
//! At run time [`FieldSet::bind`] reads every field's raw value from the property
//! context, applies the field's conversion exactly once and returns the bound
//! [`Fields`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{JobError, JobResult};
use crate::props::PropertyContext;

/// Custom conversion function.
pub type Converter = fn(&str) -> Result<FieldValue, String>;

/// Conversion applied to a field's raw value.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    /// `true/false`, `1/0`, `yes/no`, `on/off` (case-insensitive).
    Boolean,
    /// `%Y-%m-%d`
    Date,
    /// Comma separated; items are trimmed and empty items dropped.
    List,
    Custom(Converter),
}

impl FieldKind {
    pub fn convert(&self, raw: &str) -> Result<FieldValue, String> {
        match self {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|e| e.to_string()),
            FieldKind::Float => raw
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|e| e.to_string()),
            FieldKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(FieldValue::Boolean(true)),
                "false" | "0" | "no" | "off" => Ok(FieldValue::Boolean(false)),
                other => Err(format!("not a boolean: {other}")),
            },
            FieldKind::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|e| e.to_string()),
            FieldKind::List => Ok(FieldValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            FieldKind::Custom(convert) => convert(raw),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::List => "list",
            FieldKind::Custom(_) => "custom",
        }
    }
}

/// A converted field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Optional field with neither a property nor a default.
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    List(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
    required: bool,
    default: Option<String>,
    persist: bool,
}

impl Field {
    /// Optional field with no default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            persist: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::List)
    }

    /// Fail binding when the property is absent. A default is ignored for required fields.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Raw default, converted like a property value.
    pub fn default_value(mut self, raw: impl Into<String>) -> Self {
        self.default = Some(raw.into());
        self
    }

    /// Write the bound value back into the property context after a successful run.
    pub fn persist(mut self) -> Self {
        self.persist = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_raw(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_persisted(&self) -> bool {
        self.persist
    }

    /// Resolve and convert this field's value.
    pub fn bind(&self, props: &PropertyContext) -> JobResult<FieldValue> {
        let raw = match props.get(&self.name) {
            Some(raw) => raw,
            None if self.required => return Err(JobError::missing_property(&self.name)),
            None => match self.default.as_deref() {
                Some(default) => default,
                None => return Ok(FieldValue::Null),
            },
        };

        self.kind
            .convert(raw)
            .map_err(|reason| JobError::conversion(&self.name, raw, reason))
    }
}

/// Field registry of one job type.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> FieldSetBuilder {
        FieldSetBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Bind every field from `props`. Fails on the first missing or unconvertible value.
    pub fn bind(&self, props: &PropertyContext) -> JobResult<Fields> {
        let mut values = BTreeMap::new();
        let mut persisted = Vec::new();

        for field in &self.fields {
            let value = field.bind(props)?;
            if field.persist {
                persisted.push(field.name.clone());
            }
            values.insert(field.name.clone(), value);
        }

        Ok(Fields { values, persisted })
    }
}

/// Collects fields and validates name uniqueness.
#[derive(Debug, Default)]
pub struct FieldSetBuilder {
    inherited: Vec<Field>,
    declared: Vec<Field>,
    overrides: Vec<Field>,
}

impl FieldSetBuilder {
    /// Inherit every field of a parent set.
    pub fn inherit(mut self, parent: &FieldSet) -> Self {
        self.inherited.extend(parent.fields.iter().cloned());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.declared.push(field);
        self
    }

    /// Explicitly replace an inherited field with the same effective name.
    pub fn override_field(mut self, field: Field) -> Self {
        self.overrides.push(field);
        self
    }

    pub fn build(self) -> JobResult<FieldSet> {
        let mut fields = self.inherited;

        for field in self.overrides {
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(slot) => *slot = field,
                None => fields.push(field),
            }
        }
        fields.extend(self.declared);

        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(JobError::duplicate_field(&field.name));
            }
        }

        Ok(FieldSet { fields })
    }
}

/// Field values bound for one job instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    values: BTreeMap<String, FieldValue>,
    persisted: Vec<String>,
}

impl Fields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn present(&self, name: &str) -> JobResult<&FieldValue> {
        match self.values.get(name) {
            None | Some(FieldValue::Null) => Err(JobError::missing_property(name)),
            Some(value) => Ok(value),
        }
    }

    fn mismatch(name: &str, value: &FieldValue, expected: &str) -> JobError {
        JobError::conversion(name, value.to_string(), format!("expected {expected}"))
    }

    pub fn text(&self, name: &str) -> JobResult<&str> {
        match self.present(name)? {
            FieldValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(name, other, "text")),
        }
    }

    /// Text value, `None` when the field is unset.
    pub fn opt_text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> JobResult<i64> {
        match self.present(name)? {
            FieldValue::Integer(i) => Ok(*i),
            other => Err(Self::mismatch(name, other, "integer")),
        }
    }

    pub fn float(&self, name: &str) -> JobResult<f64> {
        match self.present(name)? {
            FieldValue::Float(x) => Ok(*x),
            FieldValue::Integer(i) => Ok(*i as f64),
            other => Err(Self::mismatch(name, other, "float")),
        }
    }

    pub fn boolean(&self, name: &str) -> JobResult<bool> {
        match self.present(name)? {
            FieldValue::Boolean(b) => Ok(*b),
            other => Err(Self::mismatch(name, other, "boolean")),
        }
    }

    pub fn date(&self, name: &str) -> JobResult<NaiveDate> {
        match self.present(name)? {
            FieldValue::Date(d) => Ok(*d),
            other => Err(Self::mismatch(name, other, "date")),
        }
    }

    pub fn list(&self, name: &str) -> JobResult<&[String]> {
        match self.present(name)? {
            FieldValue::List(items) => Ok(items),
            other => Err(Self::mismatch(name, other, "list")),
        }
    }

    /// Write persisted fields back into `props` as strings.
    pub fn write_back(&self, props: &mut PropertyContext) {
        for name in &self.persisted {
            if let Some(value) = self.values.get(name) {
                props.set(name.clone(), value.to_string());
            }
        }
    }
}

//! Building blocks of the job layer.
//!
//! This crate holds the pieces every job touches and that carry no execution
//! logic: the run's property context, declarative fields, output targets, the
//! property store contract and the error taxonomy.

pub mod env;
pub mod error;
pub mod field;
pub mod props;
pub mod store;
pub mod target;

pub use env::Environment;
pub use error::{FlowError, JobError, JobResult, StoreError, TargetError};
pub use field::{Field, FieldKind, FieldSet, FieldSetBuilder, FieldValue, Fields};
pub use props::PropertyContext;
pub use store::PropertyStore;
pub use target::{LocalTarget, Outputs, Target};

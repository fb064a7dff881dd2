//! Property store contract.

use crate::error::StoreError;
use crate::props::PropertyContext;

/// Loads the property context before a run and persists it afterwards.
///
/// The storage format belongs to the implementation; the job layer only sees
/// string keys and values.
pub trait PropertyStore {
    fn load(&self) -> Result<PropertyContext, StoreError>;

    fn save(&self, props: &PropertyContext) -> Result<(), StoreError>;
}

impl<S: PropertyStore + ?Sized> PropertyStore for &S {
    fn load(&self) -> Result<PropertyContext, StoreError> {
        (**self).load()
    }

    fn save(&self, props: &PropertyContext) -> Result<(), StoreError> {
        (**self).save(props)
    }
}

impl<S: PropertyStore + ?Sized> PropertyStore for std::sync::Arc<S> {
    fn load(&self) -> Result<PropertyContext, StoreError> {
        (**self).load()
    }

    fn save(&self, props: &PropertyContext) -> Result<(), StoreError> {
        (**self).save(props)
    }
}

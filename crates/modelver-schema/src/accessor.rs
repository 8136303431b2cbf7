//! Read-only schema lookup contract consumed by the migration engine

use crate::{ObjectSchema, SchemaError, Version};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Read-only lookup of object-type layouts per schema version
///
/// Implementations must be pure: the same `(object_type, version)` pair
/// always yields the same answer, and lookups have no side effects. The
/// engine shares one accessor across threads, hence `Send + Sync`.
pub trait SchemaAccessor: Send + Sync + Debug {
    /// All versions this accessor can describe, ascending
    fn versions(&self) -> Vec<Version>;

    /// Layout of `object_type` at `version`
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownVersion`] or
    /// [`SchemaError::UnknownObjectType`] when the pair is unrecognized
    fn object_schema(
        &self,
        object_type: &str,
        version: &Version,
    ) -> Result<Arc<ObjectSchema>, SchemaError>;

    /// Number of fixed fields of `object_type` at `version`
    ///
    /// # Errors
    /// Same as [`SchemaAccessor::object_schema`]
    fn field_count(&self, object_type: &str, version: &Version) -> Result<usize, SchemaError> {
        Ok(self.object_schema(object_type, version)?.field_count())
    }

    /// Ordered fixed field names of `object_type` at `version`
    ///
    /// # Errors
    /// Same as [`SchemaAccessor::object_schema`]
    fn field_names(
        &self,
        object_type: &str,
        version: &Version,
    ) -> Result<Vec<String>, SchemaError> {
        Ok(self.object_schema(object_type, version)?.field_names().to_vec())
    }

    /// Allowed values of one field, `None` for free-form fields
    ///
    /// # Errors
    /// Same as [`SchemaAccessor::object_schema`]
    fn allowed_values(
        &self,
        object_type: &str,
        version: &Version,
        index: usize,
    ) -> Result<Option<BTreeSet<String>>, SchemaError> {
        Ok(self
            .object_schema(object_type, version)?
            .allowed_values(index)
            .cloned())
    }

    /// Whether `version` is one of [`SchemaAccessor::versions`]
    fn knows_version(&self, version: &Version) -> bool {
        self.versions().contains(version)
    }
}

impl<A: SchemaAccessor + ?Sized> SchemaAccessor for Arc<A> {
    fn versions(&self) -> Vec<Version> {
        (**self).versions()
    }

    fn object_schema(
        &self,
        object_type: &str,
        version: &Version,
    ) -> Result<Arc<ObjectSchema>, SchemaError> {
        (**self).object_schema(object_type, version)
    }
}

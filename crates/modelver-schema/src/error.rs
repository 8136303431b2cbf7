//! Error types for schema lookups and bundle loading

use crate::Version;

/// Errors raised by a [`SchemaAccessor`](crate::SchemaAccessor) or while
/// building a [`SchemaRegistry`](crate::SchemaRegistry)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Version string could not be parsed
    #[error("invalid version string: '{0}'")]
    InvalidVersion(String),

    /// Version is not a release known to the accessor
    #[error("unknown schema version: {0}")]
    UnknownVersion(Version),

    /// Object type has no definition at the requested version
    #[error("unknown object type '{object_type}' at version {version}")]
    UnknownObjectType {
        /// Requested object type
        object_type: String,
        /// Requested version
        version: Version,
    },

    /// Schema bundle is internally inconsistent
    #[error("invalid schema bundle: {0}")]
    InvalidBundle(String),

    /// YAML bundle could not be decoded
    #[error("yaml decode error: {0}")]
    Yaml(String),

    /// JSON bundle could not be decoded
    #[error("json decode error: {0}")]
    Json(String),
}

impl SchemaError {
    /// Create unknown object type error
    pub fn unknown_object_type(object_type: impl Into<String>, version: Version) -> Self {
        Self::UnknownObjectType {
            object_type: object_type.into(),
            version,
        }
    }

    /// Whether this error means the `(objectType, version)` pair is unrecognized
    #[inline]
    #[must_use]
    pub fn is_unknown_schema(&self) -> bool {
        matches!(self, Self::UnknownVersion(_) | Self::UnknownObjectType { .. })
    }
}

impl From<serde_yaml::Error> for SchemaError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_object_type_display() {
        let err = SchemaError::unknown_object_type("OS:Foo", Version::new(3, 0, 0));
        assert_eq!(err.to_string(), "unknown object type 'OS:Foo' at version 3.0.0");
        assert!(err.is_unknown_schema());
    }

    #[test]
    fn bundle_errors_are_not_unknown_schema() {
        let err = SchemaError::InvalidBundle("releases out of order".to_string());
        assert!(!err.is_unknown_schema());
    }

    #[test]
    fn yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<u32>>("{not: a list").unwrap_err();
        let err: SchemaError = yaml_err.into();
        assert!(matches!(err, SchemaError::Yaml(_)));
    }
}

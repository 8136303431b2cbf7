//! Error types for the migration engine
//!
//! - [`EngineError`]: construction failures, fatal to the process
//! - [`MigrationError`]: per-document failures, fatal to that document only
//! - [`MigrationFailure`]: a [`MigrationError`] plus what was gathered before it

use crate::state::MigrationState;
use crate::ConfigError;
use modelver_document::{DocumentError, FieldLocation, RecordId};
use modelver_rules::{ChainError, Diagnostics, Revision, RuleError};
use modelver_schema::{SchemaError, Version};

/// Errors raised while constructing a [`MigrationEngine`](crate::MigrationEngine)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Version chain is not usable with the schema
    #[error("version chain error: {0}")]
    Chain(#[from] ChainError),

    /// Built-in schema could not be loaded
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Why one document could not be migrated
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Declared version is outside what the chain handles
    #[error("unsupported version {version}: supported releases are {oldest} to {latest}")]
    UnsupportedVersion {
        /// Declared version
        version: Version,
        /// Oldest release of the chain
        oldest: Version,
        /// Latest release of the chain
        latest: Version,
    },

    /// Chain has no rule for a version reached mid-migration
    #[error("no rule for version {0}")]
    NoRuleForVersion(Version),

    /// Object type or version unknown to the schema
    #[error("unknown schema{}: {source}", after(.revision))]
    UnknownSchema {
        /// Rule after which validation failed, `None` for the input
        revision: Option<Revision>,
        /// Schema lookup failure
        #[source]
        source: SchemaError,
    },

    /// A reference field points at a missing record
    #[error(
        "dangling reference to {target}{}{}",
        .referrer.map(|r| format!(" from {r}")).unwrap_or_default(),
        after(.revision)
    )]
    DanglingReference {
        /// Rule after which validation failed, `None` for the input
        revision: Option<Revision>,
        /// Missing identity
        target: RecordId,
        /// Field holding the reference
        referrer: Option<FieldLocation>,
    },

    /// A record does not match its layout
    #[error(
        "structural invariant violated by {object_type} {record} at field {field_index}{}: {reason}",
        after(.revision)
    )]
    StructuralInvariantViolation {
        /// Rule after which validation failed, `None` for the input
        revision: Option<Revision>,
        /// Offending record
        record: RecordId,
        /// Its object type
        object_type: String,
        /// First field position that breaks the layout
        field_index: usize,
        /// Human-readable description
        reason: String,
    },

    /// A rule returned an error
    #[error("rule {revision} failed: {source}")]
    RuleFailed {
        /// Failing rule
        revision: Revision,
        /// Rule error
        #[source]
        source: RuleError,
    },

    /// A rule produced a document at the wrong version
    #[error("rule {revision} produced version {produced}")]
    VersionMismatch {
        /// Offending rule
        revision: Revision,
        /// Version the output declared
        produced: Version,
    },

    /// Any other document failure
    #[error("document error{}: {source}", after(.revision))]
    Document {
        /// Rule after which it was raised, `None` for the input
        revision: Option<Revision>,
        /// Document error
        #[source]
        source: DocumentError,
    },

    /// Engine state machine reached an illegal transition
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition {
        /// State before
        from: MigrationState,
        /// Requested state
        to: MigrationState,
    },
}

fn after(revision: &Option<Revision>) -> String {
    revision.map(|r| format!(" after {r}")).unwrap_or_default()
}

impl MigrationError {
    /// Attribute a validation failure to `revision`
    #[must_use]
    pub fn from_document(error: DocumentError, revision: Option<Revision>) -> Self {
        match error {
            DocumentError::UnknownSchema(source) => Self::UnknownSchema { revision, source },
            DocumentError::DanglingReference { target, referrer } => Self::DanglingReference {
                revision,
                target,
                referrer,
            },
            DocumentError::StructuralInvariantViolation {
                record,
                object_type,
                field_index,
                reason,
            } => Self::StructuralInvariantViolation {
                revision,
                record,
                object_type,
                field_index,
                reason,
            },
            source => Self::Document { revision, source },
        }
    }

    /// Rule the failure is attributed to
    #[must_use]
    pub fn revision(&self) -> Option<Revision> {
        match self {
            Self::UnknownSchema { revision, .. }
            | Self::DanglingReference { revision, .. }
            | Self::StructuralInvariantViolation { revision, .. }
            | Self::Document { revision, .. } => *revision,
            Self::RuleFailed { revision, .. } | Self::VersionMismatch { revision, .. } => {
                Some(*revision)
            }
            Self::UnsupportedVersion { .. }
            | Self::NoRuleForVersion(_)
            | Self::IllegalTransition { .. } => None,
        }
    }

    /// Record the failure is attributed to
    #[must_use]
    pub fn record(&self) -> Option<RecordId> {
        match self {
            Self::DanglingReference {
                referrer: Some(location),
                ..
            } => Some(location.record),
            Self::StructuralInvariantViolation { record, .. } => Some(*record),
            Self::RuleFailed {
                source: RuleError::Handler { record, .. },
                ..
            } => Some(*record),
            Self::Document { source, .. } => source.record(),
            _ => None,
        }
    }
}

/// A failed migration with everything gathered before the failure
///
/// No partial document is returned.
#[derive(Debug, thiserror::Error)]
#[error("{error} (reached {reached})")]
pub struct MigrationFailure {
    /// What went wrong
    #[source]
    pub error: MigrationError,
    /// Diagnostics raised before the failure, including the failing step's
    pub diagnostics: Diagnostics,
    /// Last version the document validated at
    pub reached: Version,
}

impl MigrationFailure {
    /// Failing rule, if any
    #[inline]
    #[must_use]
    pub fn revision(&self) -> Option<Revision> {
        self.error.revision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision() -> Revision {
        Revision::new(Version::new(3, 0, 0), Version::new(3, 0, 1))
    }

    #[test]
    fn validation_errors_keep_attribution() {
        let record = RecordId::new();
        let err = MigrationError::from_document(
            DocumentError::StructuralInvariantViolation {
                record,
                object_type: "OS:Material".into(),
                field_index: 4,
                reason: "has 4 fields, expected 9".into(),
            },
            Some(revision()),
        );
        assert_eq!(err.revision(), Some(revision()));
        assert_eq!(err.record(), Some(record));
        assert!(err.to_string().contains("after 3.0.0 -> 3.0.1"));
    }

    #[test]
    fn dangling_reference_names_referrer() {
        let referrer = FieldLocation {
            record: RecordId::new(),
            field_index: 2,
        };
        let target = RecordId::new();
        let err = MigrationError::from_document(
            DocumentError::DanglingReference {
                target,
                referrer: Some(referrer),
            },
            None,
        );
        assert!(matches!(err, MigrationError::DanglingReference { .. }));
        assert_eq!(err.record(), Some(referrer.record));
        assert_eq!(err.revision(), None);
    }

    #[test]
    fn unknown_schema_maps_through() {
        let err = MigrationError::from_document(
            DocumentError::UnknownSchema(SchemaError::UnknownVersion(Version::new(9, 0, 0))),
            None,
        );
        assert!(matches!(err, MigrationError::UnknownSchema { revision: None, .. }));
        assert_eq!(err.to_string(), "unknown schema: unknown schema version: 9.0.0");
    }
}

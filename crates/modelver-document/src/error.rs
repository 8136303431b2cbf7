//! Error types for document operations and validation

use crate::{FingerprintError, RecordId};
use modelver_schema::SchemaError;
use std::fmt::{self, Display, Formatter};

/// Position of one field inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldLocation {
    /// Record holding the field
    pub record: RecordId,
    /// Field position
    pub field_index: usize,
}

impl Display for FieldLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.record, self.field_index)
    }
}

/// Errors raised by [`Document`](crate::Document) operations
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A reference does not resolve to a record in the document
    #[error(
        "dangling reference to {target}{}",
        referrer.map(|r| format!(" from {r}")).unwrap_or_default()
    )]
    DanglingReference {
        /// Missing identity
        target: RecordId,
        /// Field holding the reference, when raised by validation
        referrer: Option<FieldLocation>,
    },

    /// A record does not match its schema layout
    #[error("structural invariant violated by {object_type} {record} at field {field_index}: {reason}")]
    StructuralInvariantViolation {
        /// Offending record
        record: RecordId,
        /// Its object type
        object_type: String,
        /// First field position that breaks the layout
        field_index: usize,
        /// Human-readable description
        reason: String,
    },

    /// The schema does not know the record's object type or the version
    #[error("unknown schema: {0}")]
    UnknownSchema(#[from] SchemaError),

    /// Identity already present in the document
    #[error("duplicate record identity: {0}")]
    DuplicateRecord(RecordId),

    /// Fingerprint computation failed
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
}

impl DocumentError {
    /// Create dangling reference error raised by a lookup
    #[inline]
    #[must_use]
    pub fn dangling(target: RecordId) -> Self {
        Self::DanglingReference {
            target,
            referrer: None,
        }
    }

    /// Record the error is attributed to, if any
    #[must_use]
    pub fn record(&self) -> Option<RecordId> {
        match self {
            Self::DanglingReference { referrer, .. } => referrer.map(|r| r.record),
            Self::StructuralInvariantViolation { record, .. } | Self::DuplicateRecord(record) => {
                Some(*record)
            }
            Self::UnknownSchema(_) | Self::Fingerprint(_) => None,
        }
    }
}

/// Result type alias for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

//! Records, their identities, and positional field values

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a record, usable as a reference target
///
/// Preserved across migrations. Records created during migration get a
/// name-based identity derived from their parent so reruns reproduce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Fresh random identity
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic identity derived from a parent record and a label
    #[inline]
    #[must_use]
    pub fn derived(parent: RecordId, label: &str) -> Self {
        Self(Uuid::new_v5(&parent.0, label.as_bytes()))
    }

    /// Wrap an existing UUID
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One positional value of a record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Field {
    /// Absent value
    #[default]
    Blank,
    /// Free or enumerated text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Reference to another record in the same document
    Reference(RecordId),
}

impl Field {
    /// Text field shorthand
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Whether the field carries no value
    ///
    /// Empty text counts as blank, the way the textual format stores it.
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Blank => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text content, if this is a text field
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, parsing numeric text as well
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Target identity, if this is a reference field
    #[inline]
    #[must_use]
    pub fn as_reference(&self) -> Option<RecordId> {
        match self {
            Self::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Reference(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<RecordId> for Field {
    fn from(value: RecordId) -> Self {
        Self::Reference(value)
    }
}

/// One object instance: a typed, ordered list of fields with an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identity
    pub id: RecordId,
    /// Object type name, resolved against the schema of the document version
    pub object_type: String,
    /// Positional field values
    pub fields: Vec<Field>,
}

impl Record {
    /// Create a record with the given identity
    #[must_use]
    pub fn new(id: RecordId, object_type: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            id,
            object_type: object_type.into(),
            fields,
        }
    }

    /// Field at `index`
    #[inline]
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if record has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Indices and targets of every reference field
    pub fn references(&self) -> impl Iterator<Item = (usize, RecordId)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_reference().map(|id| (i, id)))
    }
}

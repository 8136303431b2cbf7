//! Structured migration diagnostics
//!
//! Every decision an update rule makes that a user may need to review is
//! recorded as a [`Diagnostic`]. Entries are appended in the order they are
//! raised and never modified afterwards.

use crate::Revision;
use modelver_document::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action needed
    Info,
    /// Heuristic or lossy transformation
    Warning,
    /// Decision requiring user review
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One diagnostic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Affected record, if attributable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordId>,
    /// Object type of the affected record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Revision during which the entry was raised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Create an unattributed diagnostic
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            record: None,
            object_type: None,
            revision: None,
            message: message.into(),
        }
    }

    /// Attribute to a record
    #[inline]
    #[must_use]
    pub fn for_record(mut self, record: RecordId, object_type: impl Into<String>) -> Self {
        self.record = Some(record);
        self.object_type = Some(object_type.into());
        self
    }

    /// Attach the revision that raised it
    #[inline]
    #[must_use]
    pub fn during(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.severity)?;
        if let Some(revision) = &self.revision {
            write!(f, " ({revision})")?;
        }
        if let (Some(object_type), Some(record)) = (&self.object_type, &self.record) {
            write!(f, " {object_type} {record}:")?;
        }
        write!(f, " {}", self.message)
    }
}

/// Ordered, append-only diagnostics collector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create empty collector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and mirror it as a tracing event
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let record = diagnostic.record;
        let object_type = diagnostic.object_type.as_deref().unwrap_or("");
        match diagnostic.severity {
            Severity::Info => {
                tracing::info!(record = ?record, object_type, "{}", diagnostic.message);
            }
            Severity::Warning => {
                tracing::warn!(record = ?record, object_type, "{}", diagnostic.message);
            }
            Severity::Error => {
                tracing::error!(record = ?record, object_type, "{}", diagnostic.message);
            }
        }
        self.entries.push(diagnostic);
    }

    /// Attribute entries raised without a revision to `revision`
    pub(crate) fn stamp_revision(&mut self, revision: Revision) {
        for entry in &mut self.entries {
            entry.revision.get_or_insert(revision);
        }
    }

    /// Append every entry of `other`, keeping its order
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// All entries in the order raised
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Entries of one severity
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    /// Warning entries
    #[must_use]
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.with_severity(Severity::Warning).collect()
    }

    /// Error entries
    #[must_use]
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.with_severity(Severity::Error).collect()
    }

    /// Entries attributed to one record
    #[must_use]
    pub fn for_record(&self, record: RecordId) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.record == Some(record))
            .collect()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries were raised
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into the ordered entry list
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

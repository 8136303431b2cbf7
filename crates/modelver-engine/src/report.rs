//! Migration outcome and per-step reports

use modelver_document::Document;
use modelver_rules::{ChangeLog, Diagnostic, Diagnostics, Revision, Severity};
use modelver_schema::Version;
use serde::Serialize;

/// What one rule application did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Applied rule
    pub revision: Revision,
    /// Rule description
    pub description: String,
    /// Records rewritten, created and removed
    pub changes: ChangeLog,
    /// Number of diagnostics the step raised
    pub diagnostic_count: usize,
}

impl StepReport {
    /// Whether the step left every record as it was
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A successful migration
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    /// Migrated document, at `final_version`
    pub document: Document,
    /// Version the input declared
    pub original_version: Version,
    /// Version of `document`
    pub final_version: Version,
    /// False when the input was already current; callers skip re-saving
    pub did_migrate: bool,
    /// Every diagnostic, in the order raised
    pub diagnostics: Diagnostics,
    /// One report per applied rule
    pub steps: Vec<StepReport>,
}

impl MigrationOutcome {
    /// Warning entries
    #[must_use]
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics.warnings()
    }

    /// Error entries
    #[must_use]
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics.errors()
    }

    /// Whether any entry needs user review
    #[inline]
    #[must_use]
    pub fn needs_review(&self) -> bool {
        self.diagnostics.with_severity(Severity::Error).next().is_some()
    }

    /// Summary without the document body
    #[must_use]
    pub fn summary(&self) -> MigrationSummary {
        MigrationSummary {
            original_version: self.original_version,
            final_version: self.final_version,
            did_migrate: self.did_migrate,
            steps: self.steps.len(),
            records_refactored: self.steps.iter().map(|s| s.changes.refactored.len()).sum(),
            records_created: self.steps.iter().map(|s| s.changes.created.len()).sum(),
            records_deprecated: self.steps.iter().map(|s| s.changes.deprecated.len()).sum(),
            warnings: self.warnings().len(),
            errors: self.errors().len(),
        }
    }
}

/// Counts describing a [`MigrationOutcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    /// Version the input declared
    pub original_version: Version,
    /// Version reached
    pub final_version: Version,
    /// Whether any rule ran
    pub did_migrate: bool,
    /// Rules applied
    pub steps: usize,
    /// Record rewrites across all steps
    pub records_refactored: usize,
    /// Records created across all steps
    pub records_created: usize,
    /// Records removed across all steps
    pub records_deprecated: usize,
    /// Warning count
    pub warnings: usize,
    /// Error count
    pub errors: usize,
}

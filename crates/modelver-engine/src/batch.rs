//! Parallel migration of independent documents

use crate::{MigrationEngine, MigrationFailure, MigrationOutcome};
use modelver_document::Document;
use rayon::prelude::*;

/// Result of migrating one document
pub type MigrationResult = Result<MigrationOutcome, MigrationFailure>;

/// Tally over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Documents rewritten to the latest release
    pub migrated: usize,
    /// Documents that were already current
    pub unchanged: usize,
    /// Documents that failed
    pub failed: usize,
}

impl BatchStats {
    /// Count the results of [`MigrationEngine::migrate_batch`]
    #[must_use]
    pub fn from_results(results: &[MigrationResult]) -> Self {
        results.iter().fold(Self::default(), |mut stats, result| {
            match result {
                Ok(outcome) if outcome.did_migrate => stats.migrated += 1,
                Ok(_) => stats.unchanged += 1,
                Err(_) => stats.failed += 1,
            }
            stats
        })
    }
}

impl MigrationEngine {
    /// Migrate independent documents in parallel
    ///
    /// Returns one result per input, in input order. A failure affects only
    /// its own document.
    #[must_use]
    pub fn migrate_batch(&self, documents: &[Document]) -> Vec<MigrationResult> {
        let results: Vec<MigrationResult> =
            documents.par_iter().map(|doc| self.migrate(doc)).collect();
        let stats = BatchStats::from_results(&results);
        tracing::info!(
            documents = documents.len(),
            migrated = stats.migrated,
            unchanged = stats.unchanged,
            failed = stats.failed,
            "batch complete"
        );
        results
    }
}

//! The migration engine
//!
//! Walks the version chain from a document's declared version to the latest
//! release, one rule at a time, validating the document after every rule.

use crate::error::{EngineError, MigrationError, MigrationFailure};
use crate::report::{MigrationOutcome, StepReport};
use crate::state::{MigrationState, StateTracker};
use crate::EngineConfig;
use modelver_document::Document;
use modelver_rules::{
    catalog, ChainLookup, Diagnostic, Diagnostics, Severity, StepContext, UpdateRule,
    VersionChain,
};
use modelver_schema::{CachedSchema, SchemaAccessor, Version};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, info_span, warn};

/// Migrates documents to the latest release of a [`VersionChain`]
///
/// The engine holds only read-only state and can be shared across threads;
/// each call to [`MigrationEngine::migrate`] is independent.
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    chain: Arc<VersionChain>,
    schema: Arc<dyn SchemaAccessor>,
    config: EngineConfig,
}

/// Mutable state of one `migrate` call
struct Run {
    tracker: StateTracker,
    diagnostics: Diagnostics,
}

impl MigrationEngine {
    /// Create an engine over `chain` and `schema`
    ///
    /// Lookups go through a cache sized by the configuration.
    ///
    /// # Errors
    /// Returns [`EngineError::Chain`] if the schema does not describe every
    /// release of the chain or every object type a rule handles
    pub fn new(
        chain: VersionChain,
        schema: Arc<dyn SchemaAccessor>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let schema: Arc<dyn SchemaAccessor> =
            Arc::new(CachedSchema::new(schema, config.schema_cache_capacity));
        chain.validate_against(schema.as_ref())?;
        info!(
            oldest = %chain.oldest(),
            latest = %chain.latest(),
            rules = chain.len(),
            "migration engine ready"
        );
        Ok(Self {
            chain: Arc::new(chain),
            schema,
            config,
        })
    }

    /// Engine over the built-in catalog
    ///
    /// # Errors
    /// Returns [`EngineError`] if the embedded catalog cannot be loaded
    pub fn with_builtin(config: EngineConfig) -> Result<Self, EngineError> {
        let chain = catalog::builtin_chain()?;
        let schema = catalog::builtin_schema()?;
        Self::new(chain, schema, config)
    }

    /// Version chain
    #[inline]
    #[must_use]
    pub fn chain(&self) -> &VersionChain {
        &self.chain
    }

    /// Schema accessor, behind the lookup cache
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &dyn SchemaAccessor {
        self.schema.as_ref()
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Migration target
    #[inline]
    #[must_use]
    pub fn latest_version(&self) -> Version {
        self.chain.latest()
    }

    /// Migrate `document` to the latest release
    ///
    /// The input is never modified. On failure no partial document is
    /// returned.
    ///
    /// # Errors
    /// Returns [`MigrationFailure`] carrying the [`MigrationError`], the
    /// diagnostics raised so far and the last version validated
    pub fn migrate(&self, document: &Document) -> Result<MigrationOutcome, MigrationFailure> {
        let span = info_span!("migrate", version = %document.version(), records = document.len());
        let _guard = span.enter();

        let mut run = Run {
            tracker: StateTracker::new(document.version()),
            diagnostics: Diagnostics::new(),
        };
        match self.run(document, &mut run) {
            Ok(outcome) => {
                info!(
                    from = %outcome.original_version,
                    to = %outcome.final_version,
                    did_migrate = outcome.did_migrate,
                    diagnostics = outcome.diagnostics.len(),
                    "migration complete"
                );
                Ok(outcome)
            }
            Err(error) => {
                warn!(state = %run.tracker.state(), reached = %run.tracker.version(), %error, "migration failed");
                run.tracker.fail();
                Err(MigrationFailure {
                    error,
                    diagnostics: run.diagnostics,
                    reached: run.tracker.version(),
                })
            }
        }
    }

    fn run(&self, document: &Document, run: &mut Run) -> Result<MigrationOutcome, MigrationError> {
        let original = document.version();

        if let Some(outcome) = self.accept_newer(document, run)? {
            return Ok(outcome);
        }
        if !self.chain.contains(&original) {
            return Err(self.unsupported(original));
        }
        if self.config.validate_input {
            document
                .validate(self.schema.as_ref())
                .map_err(|e| MigrationError::from_document(e, None))?;
        }

        let mut current = Cow::Borrowed(document);
        let mut steps = Vec::new();
        loop {
            let version = current.version();
            let lookup = self
                .chain
                .lookup(&version)
                .map_err(|_| MigrationError::NoRuleForVersion(version))?;
            let rule = match lookup {
                ChainLookup::Current => break,
                ChainLookup::Rule(rule) => rule,
            };

            run.tracker.advance(MigrationState::Migrating)?;
            let (next, report) = self.step(rule.as_ref(), &current, run)?;
            run.tracker.validated(next.version())?;
            steps.push(report);
            current = Cow::Owned(next);
        }
        run.tracker.advance(MigrationState::Current)?;

        let final_version = current.version();
        Ok(MigrationOutcome {
            document: current.into_owned(),
            original_version: original,
            final_version,
            did_migrate: !steps.is_empty(),
            diagnostics: std::mem::take(&mut run.diagnostics),
            steps,
        })
    }

    /// Apply one rule and validate its output
    fn step(
        &self,
        rule: &dyn UpdateRule,
        current: &Document,
        run: &mut Run,
    ) -> Result<(Document, StepReport), MigrationError> {
        let revision = rule.revision();
        let span = info_span!("step", %revision);
        let _guard = span.enter();

        let mut ctx = StepContext::new(self.schema.as_ref(), revision)
            .with_reported_drops(self.config.report_acknowledged_drops);
        let applied = rule.apply(current, &mut ctx);
        let (diagnostics, changes) = ctx.into_parts();
        let diagnostic_count = diagnostics.len();
        run.diagnostics.extend(diagnostics);

        let next = applied.map_err(|source| MigrationError::RuleFailed { revision, source })?;
        if next.version() != revision.to {
            return Err(MigrationError::VersionMismatch {
                revision,
                produced: next.version(),
            });
        }
        next.validate(self.schema.as_ref())
            .map_err(|e| MigrationError::from_document(e, Some(revision)))?;

        info!(
            description = rule.description(),
            refactored = changes.refactored.len(),
            created = changes.created.len(),
            deprecated = changes.deprecated.len(),
            diagnostics = diagnostic_count,
            "applied rule"
        );
        let report = StepReport {
            revision,
            description: rule.description().to_string(),
            changes,
            diagnostic_count,
        };
        Ok((next, report))
    }

    /// Accept a document one release ahead of the chain, if configured
    fn accept_newer(
        &self,
        document: &Document,
        run: &mut Run,
    ) -> Result<Option<MigrationOutcome>, MigrationError> {
        let declared = document.version();
        let latest = self.chain.latest();
        if declared <= latest {
            return Ok(None);
        }
        if !(self.config.allow_newer_versions && latest.is_next_version(&declared)) {
            return Err(self.unsupported(declared));
        }

        run.diagnostics.push(Diagnostic::new(
            Severity::Warning,
            format!("document version {declared} is newer than {latest}; treated as current"),
        ));
        run.tracker.advance(MigrationState::Current)?;
        Ok(Some(MigrationOutcome {
            document: document.clone(),
            original_version: declared,
            final_version: declared,
            did_migrate: false,
            diagnostics: std::mem::take(&mut run.diagnostics),
            steps: Vec::new(),
        }))
    }

    fn unsupported(&self, version: Version) -> MigrationError {
        MigrationError::UnsupportedVersion {
            version,
            oldest: self.chain.oldest(),
            latest: self.chain.latest(),
        }
    }
}

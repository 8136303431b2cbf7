//! Ordered, gap-free registry of update rules
//!
//! A [`VersionChain`] holds every supported release and exactly one rule per
//! consecutive pair. Construction is the configuration check: a chain that
//! builds has no gaps, so a per-document lookup can only fail for versions
//! outside the chain.

use crate::rule::{ComposedRule, IdentityRule, RuleError, UpdateRule};
use crate::Revision;
use modelver_schema::{SchemaAccessor, SchemaError, Version};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Chain configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// No releases declared
    #[error("version chain has no releases")]
    Empty,

    /// Releases not strictly ascending
    #[error("release {0} is out of order")]
    UnorderedRelease(Version),

    /// Rule does not map a release to the next one
    #[error("rule {0} does not connect consecutive releases")]
    UnexpectedRule(Revision),

    /// Two rules start at the same release
    #[error("more than one rule for {0}")]
    DuplicateRule(Revision),

    /// Consecutive releases without a rule
    #[error("no rule from {from} to {to}")]
    Gap {
        /// Release without an outgoing rule
        from: Version,
        /// Next release
        to: Version,
    },

    /// Version not covered by the chain
    #[error("no rule for version {0}")]
    NoRuleForVersion(Version),

    /// Chain release unknown to the schema
    #[error("release {0} is unknown to the schema")]
    UnknownRelease(Version),

    /// Handler registered for a type the schema lacks at the source version
    #[error("rule {revision} handles {object_type}, which is unknown at {}", .revision.from)]
    UnknownHandlerType {
        /// Offending rule
        revision: Revision,
        /// Handled object type
        object_type: String,
        /// Lookup failure
        #[source]
        source: SchemaError,
    },

    /// Composition failed
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Result of [`VersionChain::lookup`]
#[derive(Debug, Clone)]
pub enum ChainLookup {
    /// Rule to apply next
    Rule(Arc<dyn UpdateRule>),
    /// At or after the latest release
    Current,
}

/// Gap-free sequence of update rules between supported releases
#[derive(Debug, Clone)]
pub struct VersionChain {
    releases: Vec<Version>,
    rules: BTreeMap<Version, Arc<dyn UpdateRule>>,
}

impl VersionChain {
    /// Start building a chain
    #[inline]
    #[must_use]
    pub fn builder() -> VersionChainBuilder {
        VersionChainBuilder::default()
    }

    /// Rule to apply to a document at `from`
    ///
    /// # Errors
    /// Returns [`ChainError::NoRuleForVersion`] for versions older than the
    /// oldest release or between releases
    pub fn lookup(&self, from: &Version) -> Result<ChainLookup, ChainError> {
        if *from >= self.latest() {
            return Ok(ChainLookup::Current);
        }
        self.rules
            .get(from)
            .map(|rule| ChainLookup::Rule(Arc::clone(rule)))
            .ok_or(ChainError::NoRuleForVersion(*from))
    }

    /// All releases, oldest first
    #[inline]
    #[must_use]
    pub fn all_versions_in_order(&self) -> &[Version] {
        &self.releases
    }

    /// Oldest supported release
    #[inline]
    #[must_use]
    pub fn oldest(&self) -> Version {
        self.releases[0]
    }

    /// Latest release, the migration target
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Version {
        self.releases[self.releases.len() - 1]
    }

    /// Whether `version` is a release of this chain
    #[inline]
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        self.releases.binary_search(version).is_ok()
    }

    /// Rules in application order
    pub fn rules(&self) -> impl Iterator<Item = &Arc<dyn UpdateRule>> {
        self.rules.values()
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if chain has no rules (a single release)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// One rule equivalent to every rule from `from` up to `to`
    ///
    /// # Errors
    /// Returns [`ChainError::NoRuleForVersion`] if either end is not a
    /// release or `to` does not follow `from`
    pub fn compose(&self, from: &Version, to: &Version) -> Result<ComposedRule, ChainError> {
        if !self.contains(from) || from >= to {
            return Err(ChainError::NoRuleForVersion(*from));
        }
        if !self.contains(to) {
            return Err(ChainError::NoRuleForVersion(*to));
        }
        let rules: Vec<_> = self.rules.range(*from..*to).map(|(_, r)| Arc::clone(r)).collect();
        Ok(ComposedRule::new(rules)?)
    }

    /// Check that `schema` describes every release and every handled type
    ///
    /// # Errors
    /// Returns [`ChainError::UnknownRelease`] or
    /// [`ChainError::UnknownHandlerType`]
    pub fn validate_against<S>(&self, schema: &S) -> Result<(), ChainError>
    where
        S: SchemaAccessor + ?Sized,
    {
        if let Some(missing) = self.releases.iter().find(|v| !schema.knows_version(v)) {
            return Err(ChainError::UnknownRelease(*missing));
        }
        for rule in self.rules.values() {
            let revision = rule.revision();
            for object_type in rule.handled_types() {
                schema
                    .object_schema(object_type, &revision.from)
                    .map_err(|source| ChainError::UnknownHandlerType {
                        revision,
                        object_type: object_type.to_string(),
                        source,
                    })?;
            }
        }
        Ok(())
    }
}

/// Builder for [`VersionChain`]
#[derive(Debug, Default)]
pub struct VersionChainBuilder {
    releases: Vec<Version>,
    rules: Vec<Arc<dyn UpdateRule>>,
}

impl VersionChainBuilder {
    /// Declare releases, oldest first
    #[must_use]
    pub fn releases<I>(mut self, releases: I) -> Self
    where
        I: IntoIterator<Item = Version>,
    {
        self.releases.extend(releases);
        self
    }

    /// Register a rule
    #[must_use]
    pub fn rule(mut self, rule: impl UpdateRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Register a shared rule
    #[must_use]
    pub fn shared_rule(mut self, rule: Arc<dyn UpdateRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Register an identity step
    #[must_use]
    pub fn identity(self, from: Version, to: Version) -> Self {
        self.rule(IdentityRule::new(Revision::new(from, to)))
    }

    /// Register identity steps for every release pair that has no rule yet
    #[must_use]
    pub fn fill_identity(mut self) -> Self {
        let covered: Vec<Version> = self.rules.iter().map(|r| r.revision().from).collect();
        let missing: Vec<Revision> = self
            .releases
            .windows(2)
            .filter(|pair| !covered.contains(&pair[0]))
            .map(|pair| Revision::new(pair[0], pair[1]))
            .collect();
        for revision in missing {
            self.rules.push(Arc::new(IdentityRule::new(revision)));
        }
        self
    }

    /// Build and verify the chain
    ///
    /// # Errors
    /// Returns [`ChainError::Empty`], [`ChainError::UnorderedRelease`],
    /// [`ChainError::UnexpectedRule`], [`ChainError::DuplicateRule`] or
    /// [`ChainError::Gap`]
    pub fn build(self) -> Result<VersionChain, ChainError> {
        if self.releases.is_empty() {
            return Err(ChainError::Empty);
        }
        if let Some(pair) = self.releases.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ChainError::UnorderedRelease(pair[1]));
        }

        let next: BTreeMap<Version, Version> = self
            .releases
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();

        let mut rules: BTreeMap<Version, Arc<dyn UpdateRule>> = BTreeMap::new();
        for rule in self.rules {
            let revision = rule.revision();
            if next.get(&revision.from) != Some(&revision.to) {
                return Err(ChainError::UnexpectedRule(revision));
            }
            if rules.contains_key(&revision.from) {
                return Err(ChainError::DuplicateRule(revision));
            }
            rules.insert(revision.from, rule);
        }

        if let Some((from, to)) = next.iter().find(|(from, _)| !rules.contains_key(*from)) {
            return Err(ChainError::Gap { from: *from, to: *to });
        }

        tracing::debug!(
            releases = self.releases.len(),
            rules = rules.len(),
            "version chain built"
        );
        Ok(VersionChain {
            releases: self.releases,
            rules,
        })
    }
}

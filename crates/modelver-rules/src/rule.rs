//! Update rules: one schema revision each
//!
//! A rule consumes a document valid at `revision.from` and produces a new
//! document at `revision.to`. The source is never mutated; handlers read the
//! pre-revision snapshot and write into the output under construction.

use crate::edit::RecordEdit;
use crate::primitives::{EditError, LossPolicy};
use crate::{Diagnostic, Diagnostics, Revision};
use modelver_document::{Document, DocumentError, Record, RecordId};
use modelver_schema::SchemaAccessor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Errors raised while applying a rule
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A primitive was misapplied
    #[error(transparent)]
    Edit(#[from] EditError),

    /// Output document could not be assembled
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A record handler failed
    #[error("handler for {object_type} record {record} failed: {source}")]
    Handler {
        /// Object type being handled
        object_type: String,
        /// Record being handled
        record: RecordId,
        /// Underlying failure
        #[source]
        source: Box<RuleError>,
    },

    /// Two handlers registered for the same object type
    #[error("duplicate handler for {0}")]
    DuplicateHandler(String),

    /// A rule's pattern failed to compile
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Composed rules do not follow each other
    #[error("rules are not consecutive: {first} then {second}")]
    NotConsecutive {
        /// Earlier rule
        first: Revision,
        /// Rule that does not start where `first` ends
        second: Revision,
    },

    /// Nothing to compose
    #[error("cannot compose an empty rule list")]
    EmptyComposition,
}

/// One record rewritten by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChange {
    /// Record as it was at the source version
    pub before: Record,
    /// Record as emitted at the target version
    pub after: Record,
}

/// Records touched by one rule application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    /// Records whose type or fields changed
    pub refactored: Vec<RecordChange>,
    /// Records emitted by handlers
    pub created: Vec<Record>,
    /// Records removed from the output
    pub deprecated: Vec<Record>,
}

impl ChangeLog {
    /// Check if the rule changed nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refactored.is_empty() && self.created.is_empty() && self.deprecated.is_empty()
    }

    /// Append another log
    pub fn extend(&mut self, other: ChangeLog) {
        self.refactored.extend(other.refactored);
        self.created.extend(other.created);
        self.deprecated.extend(other.deprecated);
    }
}

/// Per-application state shared by a rule and its handlers
pub struct StepContext<'a> {
    pub(crate) schema: &'a dyn SchemaAccessor,
    pub(crate) revision: Revision,
    pub(crate) lossy_acknowledged: bool,
    pub(crate) report_acknowledged_drops: bool,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) changes: ChangeLog,
}

impl<'a> StepContext<'a> {
    /// Create a context for applying `revision`
    #[must_use]
    pub fn new(schema: &'a dyn SchemaAccessor, revision: Revision) -> Self {
        Self {
            schema,
            revision,
            lossy_acknowledged: false,
            report_acknowledged_drops: false,
            diagnostics: Diagnostics::new(),
            changes: ChangeLog::default(),
        }
    }

    /// Report intentional drops of non-blank values at info severity
    #[inline]
    #[must_use]
    pub fn with_reported_drops(mut self, report: bool) -> Self {
        self.report_acknowledged_drops = report;
        self
    }

    /// Schema used for target-version lookups
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &'a dyn SchemaAccessor {
        self.schema
    }

    /// Revision being applied
    #[inline]
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Treat every delete in this application as intentional
    pub fn acknowledge_lossy(&mut self, acknowledged: bool) {
        self.lossy_acknowledged = acknowledged;
    }

    /// Effective policy for a delete; `intentional` marks an explicit drop
    #[must_use]
    pub fn loss_policy(&self, intentional: bool) -> LossPolicy {
        match (intentional || self.lossy_acknowledged, self.report_acknowledged_drops) {
            (false, _) => LossPolicy::Diagnose,
            (true, true) => LossPolicy::Reported,
            (true, false) => LossPolicy::Acknowledged,
        }
    }

    /// Record a diagnostic raised during this revision
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic.during(self.revision));
    }

    /// Diagnostics raised so far
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Changes recorded so far
    #[inline]
    #[must_use]
    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    /// Consume into diagnostics, each attributed to a revision, and the change log
    #[must_use]
    pub fn into_parts(self) -> (Diagnostics, ChangeLog) {
        let mut diagnostics = self.diagnostics;
        diagnostics.stamp_revision(self.revision);
        (diagnostics, self.changes)
    }

    fn absorb(&mut self, diagnostics: Diagnostics, changes: ChangeLog) {
        self.diagnostics.extend(diagnostics);
        self.changes.extend(changes);
    }
}

impl Debug for StepContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("revision", &self.revision)
            .field("lossy_acknowledged", &self.lossy_acknowledged)
            .field("report_acknowledged_drops", &self.report_acknowledged_drops)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

/// A transformation from one schema version to the next
///
/// Implementations are stateless and deterministic: applying the same rule
/// to the same source always yields an identical document and diagnostics.
pub trait UpdateRule: Send + Sync + Debug {
    /// Versions consumed and produced
    fn revision(&self) -> Revision;

    /// Short human-readable summary
    fn description(&self) -> &str;

    /// Produce the document at `revision().to`
    ///
    /// # Errors
    /// Returns [`RuleError`] if a handler fails or the output cannot be
    /// assembled
    fn apply(&self, source: &Document, ctx: &mut StepContext<'_>) -> Result<Document, RuleError>;

    /// Object types with dedicated handlers, read at their source version
    fn handled_types(&self) -> Vec<&str> {
        Vec::new()
    }
}

type HandlerFn = dyn Fn(&mut RecordEdit<'_, '_>) -> Result<(), RuleError> + Send + Sync;

/// Rule driven by a table of per-object-type handlers
///
/// Records whose type has no handler are copied unchanged. Records spawned
/// by a handler are placed right after the record that spawned them.
pub struct RevisionRule {
    revision: Revision,
    description: String,
    handlers: BTreeMap<String, Arc<HandlerFn>>,
    acknowledge_lossy: bool,
}

impl RevisionRule {
    /// Start building a rule for `revision`
    #[must_use]
    pub fn builder(revision: Revision, description: impl Into<String>) -> RevisionRuleBuilder {
        RevisionRuleBuilder {
            revision,
            description: description.into(),
            handlers: Vec::new(),
            acknowledge_lossy: false,
        }
    }

    /// Whether every delete in this rule is intentional
    #[inline]
    #[must_use]
    pub fn is_acknowledged_lossy(&self) -> bool {
        self.acknowledge_lossy
    }

    fn apply_handler(
        &self,
        handler: &HandlerFn,
        source: &Document,
        record: &Record,
        output: &mut Document,
        ctx: &mut StepContext<'_>,
    ) -> Result<(), RuleError> {
        let mut edit = RecordEdit::new(source, record, ctx);
        handler(&mut edit).map_err(|err| RuleError::Handler {
            object_type: record.object_type.clone(),
            record: record.id,
            source: Box::new(err),
        })?;
        let outcome = edit.finish();

        if outcome.deprecated {
            ctx.push(
                Diagnostic::new(crate::Severity::Warning, "record removed, no equivalent in target version")
                    .for_record(record.id, record.object_type.clone()),
            );
            ctx.changes.deprecated.push(record.clone());
        } else {
            if outcome.record != *record {
                ctx.changes.refactored.push(RecordChange {
                    before: record.clone(),
                    after: outcome.record.clone(),
                });
            }
            output.insert_record(outcome.record)?;
        }

        for spawned in outcome.spawned {
            ctx.changes.created.push(spawned.clone());
            output.insert_record(spawned)?;
        }
        Ok(())
    }
}

impl UpdateRule for RevisionRule {
    fn revision(&self) -> Revision {
        self.revision
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, source: &Document, ctx: &mut StepContext<'_>) -> Result<Document, RuleError> {
        ctx.acknowledge_lossy(self.acknowledge_lossy);
        let mut output = Document::new(self.revision.to);

        for record in source.records() {
            match self.handlers.get(&record.object_type) {
                Some(handler) => {
                    self.apply_handler(handler.as_ref(), source, record, &mut output, ctx)?;
                }
                None => output.insert_record(record.clone())?,
            }
        }

        tracing::debug!(
            revision = %self.revision,
            refactored = ctx.changes.refactored.len(),
            created = ctx.changes.created.len(),
            deprecated = ctx.changes.deprecated.len(),
            "rule applied"
        );
        Ok(output)
    }

    fn handled_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

impl Debug for RevisionRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionRule")
            .field("revision", &self.revision)
            .field("description", &self.description)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("acknowledge_lossy", &self.acknowledge_lossy)
            .finish()
    }
}

/// Builder for [`RevisionRule`]
pub struct RevisionRuleBuilder {
    revision: Revision,
    description: String,
    handlers: Vec<(String, Arc<HandlerFn>)>,
    acknowledge_lossy: bool,
}

impl RevisionRuleBuilder {
    /// Register the handler for one object type
    #[must_use]
    pub fn handler<F>(mut self, object_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut RecordEdit<'_, '_>) -> Result<(), RuleError> + Send + Sync + 'static,
    {
        self.handlers.push((object_type.into(), Arc::new(handler)));
        self
    }

    /// Treat every delete in the rule as an intentional drop
    #[inline]
    #[must_use]
    pub fn acknowledge_lossy(mut self) -> Self {
        self.acknowledge_lossy = true;
        self
    }

    /// Build the rule
    ///
    /// # Errors
    /// Returns [`RuleError::DuplicateHandler`] if an object type was
    /// registered twice
    pub fn build(self) -> Result<RevisionRule, RuleError> {
        let mut handlers = BTreeMap::new();
        for (object_type, handler) in self.handlers {
            if handlers.contains_key(&object_type) {
                return Err(RuleError::DuplicateHandler(object_type));
            }
            handlers.insert(object_type, handler);
        }
        Ok(RevisionRule {
            revision: self.revision,
            description: self.description,
            handlers,
            acknowledge_lossy: self.acknowledge_lossy,
        })
    }
}

impl Debug for RevisionRuleBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionRuleBuilder")
            .field("revision", &self.revision)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// A release that changed none of the modeled object types
#[derive(Debug, Clone)]
pub struct IdentityRule {
    revision: Revision,
}

impl IdentityRule {
    /// Create identity step
    #[inline]
    #[must_use]
    pub fn new(revision: Revision) -> Self {
        Self { revision }
    }
}

impl UpdateRule for IdentityRule {
    fn revision(&self) -> Revision {
        self.revision
    }

    fn description(&self) -> &str {
        "no changes to modeled object types"
    }

    fn apply(&self, source: &Document, _ctx: &mut StepContext<'_>) -> Result<Document, RuleError> {
        let mut output = Document::new(self.revision.to);
        for record in source.records() {
            output.insert_record(record.clone())?;
        }
        Ok(output)
    }
}

/// Sequential composition of consecutive rules
///
/// Each inner rule runs with its own context so diagnostics keep the
/// revision that raised them.
#[derive(Debug, Clone)]
pub struct ComposedRule {
    revision: Revision,
    description: String,
    rules: Vec<Arc<dyn UpdateRule>>,
}

impl ComposedRule {
    /// Compose `rules` in order
    ///
    /// # Errors
    /// Returns [`RuleError::EmptyComposition`] or
    /// [`RuleError::NotConsecutive`]
    pub fn new(rules: Vec<Arc<dyn UpdateRule>>) -> Result<Self, RuleError> {
        let (first, last) = match (rules.first(), rules.last()) {
            (Some(first), Some(last)) => (first.revision(), last.revision()),
            _ => return Err(RuleError::EmptyComposition),
        };
        for pair in rules.windows(2) {
            let (a, b) = (pair[0].revision(), pair[1].revision());
            if a.to != b.from {
                return Err(RuleError::NotConsecutive { first: a, second: b });
            }
        }

        let revision = Revision::new(first.from, last.to);
        Ok(Self {
            revision,
            description: format!("composition of {} rules", rules.len()),
            rules,
        })
    }

    /// Inner rules in application order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[Arc<dyn UpdateRule>] {
        &self.rules
    }
}

impl UpdateRule for ComposedRule {
    fn revision(&self) -> Revision {
        self.revision
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, source: &Document, ctx: &mut StepContext<'_>) -> Result<Document, RuleError> {
        let mut current: Option<Document> = None;
        for rule in &self.rules {
            let mut inner = StepContext::new(ctx.schema, rule.revision())
                .with_reported_drops(ctx.report_acknowledged_drops);
            let input = current.as_ref().unwrap_or(source);
            let output = rule.apply(input, &mut inner)?;
            let (diagnostics, changes) = inner.into_parts();
            ctx.absorb(diagnostics, changes);
            current = Some(output);
        }
        // `new` rejects empty lists, so at least one rule ran
        current.ok_or(RuleError::EmptyComposition)
    }

    fn handled_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.rules.iter().flat_map(|r| r.handled_types()).collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use modelver_document::Field;
    use modelver_schema::{SchemaRegistry, Version};
    use pretty_assertions::assert_eq;

    const BUNDLE: &str = r#"
releases:
  - version: "1.0.0"
    objects:
      OS:Widget:
        fields: [Name, A, B, C, D]
      OS:Other:
        fields: [Name]
  - version: "1.1.0"
    objects:
      OS:Widget:
        fields: [Name, A, B, New, C, D]
  - version: "1.2.0"
"#;

    fn v(minor: u32) -> Version {
        Version::new(1, minor, 0)
    }

    fn schema() -> SchemaRegistry {
        SchemaRegistry::from_yaml_str(BUNDLE).unwrap()
    }

    fn widget_rule() -> RevisionRule {
        RevisionRule::builder(Revision::new(v(0), v(1)), "widget gains a field")
            .handler("OS:Widget", |edit| {
                edit.insert(3, Field::text("default"))?;
                Ok(())
            })
            .build()
            .unwrap()
    }

    fn texts(values: &[&str]) -> Vec<Field> {
        values.iter().map(|s| Field::text(*s)).collect()
    }

    fn source() -> (Document, RecordId, RecordId) {
        let mut doc = Document::new(v(0));
        let widget = doc.add_record("OS:Widget", texts(&["A", "B", "C", "D", "E"]));
        let other = doc.add_record("OS:Other", texts(&["o"]));
        (doc, widget, other)
    }

    #[test]
    fn handler_inserts_and_others_copy() {
        let schema = schema();
        let (doc, widget, other) = source();
        let mut ctx = StepContext::new(&schema, widget_rule().revision());

        let out = widget_rule().apply(&doc, &mut ctx).unwrap();

        assert_eq!(out.version(), v(1));
        assert_eq!(
            out.get(widget).unwrap().fields,
            texts(&["A", "B", "C", "default", "D", "E"])
        );
        assert_eq!(out.get(other), doc.get(other));
        assert_eq!(ctx.changes().refactored.len(), 1);
        assert!(ctx.diagnostics().is_empty());
        assert_eq!(doc.get(widget).unwrap().len(), 5);
    }

    #[test]
    fn duplicate_handler_rejected() {
        let result = RevisionRule::builder(Revision::new(v(0), v(1)), "dup")
            .handler("OS:Widget", |_| Ok(()))
            .handler("OS:Widget", |_| Ok(()))
            .build();
        assert!(matches!(result, Err(RuleError::DuplicateHandler(t)) if t == "OS:Widget"));
    }

    #[test]
    fn handler_failure_is_wrapped() {
        let schema = schema();
        let (doc, widget, _) = source();
        let rule = RevisionRule::builder(Revision::new(v(0), v(1)), "broken")
            .handler("OS:Widget", |edit| {
                edit.insert(99, Field::Blank)?;
                Ok(())
            })
            .build()
            .unwrap();
        let mut ctx = StepContext::new(&schema, rule.revision());

        match rule.apply(&doc, &mut ctx) {
            Err(RuleError::Handler { object_type, record, source }) => {
                assert_eq!(object_type, "OS:Widget");
                assert_eq!(record, widget);
                assert!(matches!(*source, RuleError::Edit(EditError::IndexOutOfRange { .. })));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn spawned_records_follow_parent() {
        let schema = schema();
        let (doc, widget, other) = source();
        let rule = RevisionRule::builder(Revision::new(v(0), v(1)), "spawn")
            .handler("OS:Widget", |edit| {
                let parent = edit.id();
                edit.insert(3, Field::Blank)?;
                edit.spawn("OS:Other", vec![Field::Reference(parent)]);
                Ok(())
            })
            .build()
            .unwrap();
        let mut ctx = StepContext::new(&schema, rule.revision());
        let out = rule.apply(&doc, &mut ctx).unwrap();

        let order: Vec<RecordId> = out.records().map(|r| r.id).collect();
        let spawned = RecordId::derived(widget, "OS:Other#0");
        assert_eq!(order, vec![widget, spawned, other]);
        assert_eq!(ctx.changes().created.len(), 1);
    }

    #[test]
    fn deprecated_record_is_removed_and_reported() {
        let schema = schema();
        let (doc, _, other) = source();
        let rule = RevisionRule::builder(Revision::new(v(0), v(1)), "drop other")
            .handler("OS:Widget", |edit| {
                edit.insert(3, Field::Blank)?;
                Ok(())
            })
            .handler("OS:Other", |edit| {
                edit.deprecate();
                Ok(())
            })
            .build()
            .unwrap();
        let mut ctx = StepContext::new(&schema, rule.revision());
        let out = rule.apply(&doc, &mut ctx).unwrap();

        assert!(!out.contains(other));
        assert_eq!(ctx.changes().deprecated.len(), 1);
        let (diagnostics, _) = ctx.into_parts();
        assert_eq!(diagnostics.warnings().len(), 1);
        assert_eq!(diagnostics.entries()[0].revision, Some(rule.revision()));
    }

    #[test]
    fn loss_policy_resolution() {
        let schema = schema();
        let mut ctx = StepContext::new(&schema, Revision::new(v(0), v(1)));
        assert_eq!(ctx.loss_policy(false), LossPolicy::Diagnose);
        assert_eq!(ctx.loss_policy(true), LossPolicy::Acknowledged);

        ctx.acknowledge_lossy(true);
        assert_eq!(ctx.loss_policy(false), LossPolicy::Acknowledged);

        let reported = StepContext::new(&schema, Revision::new(v(0), v(1))).with_reported_drops(true);
        assert_eq!(reported.loss_policy(true), LossPolicy::Reported);
    }

    #[test]
    fn acknowledged_rule_drops_silently() {
        let schema = schema();
        let mut doc = Document::new(v(0));
        doc.add_record("OS:Widget", texts(&["A", "B", "C", "D", "E"]));
        let rule = RevisionRule::builder(Revision::new(v(0), v(1)), "lossy")
            .handler("OS:Widget", |edit| {
                edit.delete(1)?;
                edit.insert(1, Field::Blank)?;
                edit.insert(3, Field::Blank)?;
                Ok(())
            })
            .acknowledge_lossy()
            .build()
            .unwrap();
        assert!(rule.is_acknowledged_lossy());

        let mut ctx = StepContext::new(&schema, rule.revision());
        rule.apply(&doc, &mut ctx).unwrap();
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn composed_rule_equals_sequence() {
        let schema = schema();
        let (doc, _, _) = source();
        let first: Arc<dyn UpdateRule> = Arc::new(widget_rule());
        let second: Arc<dyn UpdateRule> = Arc::new(IdentityRule::new(Revision::new(v(1), v(2))));

        let mut ctx1 = StepContext::new(&schema, first.revision());
        let mid = first.apply(&doc, &mut ctx1).unwrap();
        let mut ctx2 = StepContext::new(&schema, second.revision());
        let sequential = second.apply(&mid, &mut ctx2).unwrap();

        let composed = ComposedRule::new(vec![first, second]).unwrap();
        assert_eq!(composed.revision(), Revision::new(v(0), v(2)));
        assert_eq!(composed.handled_types(), vec!["OS:Widget"]);
        let mut ctx = StepContext::new(&schema, composed.revision());
        let combined = composed.apply(&doc, &mut ctx).unwrap();

        assert_eq!(combined, sequential);
        assert_eq!(combined.fingerprint().unwrap(), sequential.fingerprint().unwrap());
    }

    #[test]
    fn composed_rule_checks_order() {
        let a: Arc<dyn UpdateRule> = Arc::new(IdentityRule::new(Revision::new(v(0), v(1))));
        let c: Arc<dyn UpdateRule> = Arc::new(IdentityRule::new(Revision::new(v(2), v(3))));
        assert!(matches!(
            ComposedRule::new(vec![a, c]),
            Err(RuleError::NotConsecutive { .. })
        ));
        assert!(matches!(ComposedRule::new(Vec::new()), Err(RuleError::EmptyComposition)));
    }

    #[test]
    fn pushed_diagnostics_carry_revision() {
        let schema = schema();
        let revision = Revision::new(v(0), v(1));
        let mut ctx = StepContext::new(&schema, revision);
        ctx.push(Diagnostic::new(Severity::Info, "note"));
        assert_eq!(ctx.diagnostics().entries()[0].revision, Some(revision));
    }
}

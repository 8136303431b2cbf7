//! Working surface handed to record handlers

use crate::primitives::{self, EditError, EnumRemap, RemapOutcome};
use crate::rule::StepContext;
use crate::{Diagnostic, Revision, Severity};
use modelver_document::{Document, Field, Record, RecordId};
use std::fmt::Display;
use std::ops::Range;

/// One record being rewritten by a handler
///
/// Edits apply to a working copy in the order they are called. The source
/// document and the original record stay readable throughout.
#[derive(Debug)]
pub struct RecordEdit<'a, 'ctx> {
    source: &'a Document,
    original: &'a Record,
    record: Record,
    spawned: Vec<Record>,
    deprecated: bool,
    ctx: &'a mut StepContext<'ctx>,
}

pub(crate) struct EditOutcome {
    pub(crate) record: Record,
    pub(crate) spawned: Vec<Record>,
    pub(crate) deprecated: bool,
}

impl<'a, 'ctx> RecordEdit<'a, 'ctx> {
    pub(crate) fn new(
        source: &'a Document,
        original: &'a Record,
        ctx: &'a mut StepContext<'ctx>,
    ) -> Self {
        Self {
            source,
            original,
            record: original.clone(),
            spawned: Vec::new(),
            deprecated: false,
            ctx,
        }
    }

    /// Document at the source version
    #[inline]
    #[must_use]
    pub fn source(&self) -> &'a Document {
        self.source
    }

    /// Record as it was before this handler ran
    #[inline]
    #[must_use]
    pub fn original(&self) -> &'a Record {
        self.original
    }

    /// Identity of the record
    #[inline]
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.record.id
    }

    /// Current object type
    #[inline]
    #[must_use]
    pub fn object_type(&self) -> &str {
        &self.record.object_type
    }

    /// Current fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.record.fields
    }

    /// Current field at `index`
    #[inline]
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.record.field(index)
    }

    /// Revision being applied
    #[inline]
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.ctx.revision
    }

    /// Insert `value` at `index`
    ///
    /// # Errors
    /// Returns [`EditError`] if `index` is past the end
    pub fn insert(&mut self, index: usize, value: impl Into<Field>) -> Result<(), EditError> {
        primitives::insert_field_at(&mut self.record, index, value.into())
    }

    /// Delete the field at `index`, diagnosing a non-blank value unless the
    /// rule is acknowledged lossy
    ///
    /// # Errors
    /// Returns [`EditError`] if `index` is out of range
    pub fn delete(&mut self, index: usize) -> Result<Field, EditError> {
        let policy = self.ctx.loss_policy(false);
        primitives::delete_field_at(&mut self.record, index, policy, &mut self.ctx.diagnostics)
    }

    /// Delete the field at `index` as an intentional drop
    ///
    /// # Errors
    /// Returns [`EditError`] if `index` is out of range
    pub fn drop_field_at(&mut self, index: usize) -> Result<Field, EditError> {
        let policy = self.ctx.loss_policy(true);
        primitives::delete_field_at(&mut self.record, index, policy, &mut self.ctx.diagnostics)
    }

    /// Remove and return every field from `index` on
    ///
    /// The caller takes ownership of the values, typically to relocate them
    /// into a spawned record, so nothing is diagnosed.
    ///
    /// # Errors
    /// Returns [`EditError`] if `index` is past the end
    pub fn take_tail(&mut self, index: usize) -> Result<Vec<Field>, EditError> {
        primitives::split_fields_off(&mut self.record, index)
    }

    /// Relocate `range` so it starts at `dest` in post-removal positions
    ///
    /// # Errors
    /// Returns [`EditError`] for a bad range or destination
    pub fn move_range(&mut self, range: Range<usize>, dest: usize) -> Result<(), EditError> {
        primitives::move_field_range(&mut self.record, range, dest)
    }

    /// Change the object type
    pub fn rename(&mut self, object_type: impl Into<String>) {
        primitives::rename_object_type(&mut self.record, object_type);
    }

    /// Remap field `index` through `table`
    ///
    /// # Errors
    /// Returns [`EditError`] if `index` is out of range
    pub fn remap(&mut self, index: usize, table: &EnumRemap) -> Result<RemapOutcome, EditError> {
        primitives::remap_enum_value(&mut self.record, index, table, &mut self.ctx.diagnostics)
    }

    /// Derive field `index` from the current fields
    ///
    /// Returns whether a value was derived; failures leave the field blank
    /// with an error diagnostic.
    ///
    /// # Errors
    /// Returns [`EditError`] if `index` is out of range
    pub fn compute<F, E>(&mut self, index: usize, derive: F) -> Result<bool, EditError>
    where
        F: FnOnce(&[Field]) -> Result<Field, E>,
        E: Display,
    {
        primitives::compute_derived_field(&mut self.record, index, derive, &mut self.ctx.diagnostics)
    }

    /// Overwrite field `index`, returning the previous value
    ///
    /// # Errors
    /// Returns [`EditError`] if `index` is out of range
    pub fn set(&mut self, index: usize, value: impl Into<Field>) -> Result<Field, EditError> {
        primitives::set_field(&mut self.record, index, value.into())
    }

    /// Append fields at the end, typically one extensible group
    pub fn push<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        self.record.fields.extend(fields);
    }

    /// Emit a new record right after this one
    ///
    /// Its identity is derived from this record's, so reruns reproduce it.
    pub fn spawn(&mut self, object_type: impl Into<String>, fields: Vec<Field>) -> RecordId {
        let object_type = object_type.into();
        let label = format!("{object_type}#{}", self.spawned.len());
        let id = RecordId::derived(self.record.id, &label);
        tracing::trace!(parent = %self.record.id, %id, %object_type, "spawn record");
        self.spawned.push(Record::new(id, object_type, fields));
        id
    }

    /// Remove this record from the output
    pub fn deprecate(&mut self) {
        self.deprecated = true;
    }

    /// Attach an info diagnostic to this record
    pub fn info(&mut self, message: impl Into<String>) {
        self.diagnose(Severity::Info, message.into());
    }

    /// Attach a warning to this record
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnose(Severity::Warning, message.into());
    }

    /// Attach an error diagnostic to this record
    pub fn error(&mut self, message: impl Into<String>) {
        self.diagnose(Severity::Error, message.into());
    }

    fn diagnose(&mut self, severity: Severity, message: String) {
        let diagnostic = Diagnostic::new(severity, message)
            .for_record(self.record.id, self.record.object_type.clone());
        self.ctx.push(diagnostic);
    }

    pub(crate) fn finish(self) -> EditOutcome {
        EditOutcome {
            record: self.record,
            spawned: self.spawned,
            deprecated: self.deprecated,
        }
    }
}

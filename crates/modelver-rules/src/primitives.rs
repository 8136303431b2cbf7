//! Positional field-editing primitives
//!
//! Update rules never compute shifted indices by hand. They compose these
//! operations, each of which states its index arithmetic once. Every
//! primitive acts on a single record and reports recoverable conditions to a
//! [`Diagnostics`] collector instead of failing.

use crate::{Diagnostic, Diagnostics, Severity};
use modelver_document::{Field, Record};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Errors from misapplied primitives
///
/// These always indicate a defective rule, never bad input data: the input
/// document was validated against the source schema before any rule ran.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Field index past the end of the record
    #[error("{object_type}: field index {index} out of range for {len} fields")]
    IndexOutOfRange {
        /// Object type of the record
        object_type: String,
        /// Requested index
        index: usize,
        /// Record length at the time
        len: usize,
    },

    /// Source range not inside the record
    #[error("{object_type}: field range {start}..{end} out of range for {len} fields")]
    RangeOutOfBounds {
        /// Object type of the record
        object_type: String,
        /// Range start
        start: usize,
        /// Range end
        end: usize,
        /// Record length at the time
        len: usize,
    },
}

impl EditError {
    fn index(record: &Record, index: usize) -> Self {
        Self::IndexOutOfRange {
            object_type: record.object_type.clone(),
            index,
            len: record.len(),
        }
    }
}

/// How deleting a non-blank value is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LossPolicy {
    /// Report as a warning
    #[default]
    Diagnose,
    /// Intentional drop, reported at info severity
    Reported,
    /// Intentional drop, not reported
    Acknowledged,
}

/// Exact-match value renaming table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumRemap {
    table: BTreeMap<String, String>,
    passthrough_unmapped: bool,
}

impl EnumRemap {
    /// Create a table from `(old, new)` pairs
    #[must_use]
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            passthrough_unmapped: false,
        }
    }

    /// Leave unmapped values alone without a warning
    ///
    /// For free-text fields where most values are legitimately absent from
    /// the table, such as output variable names.
    #[inline]
    #[must_use]
    pub fn passthrough_unmapped(mut self) -> Self {
        self.passthrough_unmapped = true;
        self
    }

    /// Replacement for `value`
    #[inline]
    #[must_use]
    pub fn get(&self, value: &str) -> Option<&str> {
        self.table.get(value).map(String::as_str)
    }

    /// Whether unmapped values pass silently
    #[inline]
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.passthrough_unmapped
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Result of [`remap_enum_value`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemapOutcome {
    /// Value rewritten
    Remapped {
        /// Previous value
        from: String,
        /// New value
        to: String,
    },
    /// Blank, or passed through silently
    Unchanged,
    /// Not in the table; left as is and diagnosed
    Unmapped(String),
}

/// Insert `value` at `index`, shifting fields at or after it one position right
///
/// # Errors
/// Returns [`EditError::IndexOutOfRange`] if `index > len`
pub fn insert_field_at(record: &mut Record, index: usize, value: Field) -> Result<(), EditError> {
    if index > record.len() {
        return Err(EditError::index(record, index));
    }
    tracing::trace!(object_type = %record.object_type, index, "insert field");
    record.fields.insert(index, value);
    Ok(())
}

/// Remove the field at `index`, shifting later fields left
///
/// A non-blank removed value is reported according to `policy`.
///
/// # Errors
/// Returns [`EditError::IndexOutOfRange`] if `index >= len`
pub fn delete_field_at(
    record: &mut Record,
    index: usize,
    policy: LossPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<Field, EditError> {
    if index >= record.len() {
        return Err(EditError::index(record, index));
    }
    tracing::trace!(object_type = %record.object_type, index, "delete field");
    let removed = record.fields.remove(index);

    if !removed.is_blank() {
        let severity = match policy {
            LossPolicy::Diagnose => Some(Severity::Warning),
            LossPolicy::Reported => Some(Severity::Info),
            LossPolicy::Acknowledged => None,
        };
        if let Some(severity) = severity {
            diagnostics.push(
                Diagnostic::new(
                    severity,
                    format!("dropped field {index} with value '{removed}'"),
                )
                .for_record(record.id, record.object_type.clone()),
            );
        }
    }
    Ok(removed)
}

/// Relocate the contiguous fields in `source` so the run starts at `dest`
///
/// `dest` is a position in the record as it is with the run taken out, so
/// `dest == len - source.len()` moves the run to the end.
///
/// # Errors
/// Returns [`EditError::RangeOutOfBounds`] for a bad range and
/// [`EditError::IndexOutOfRange`] for a bad destination
pub fn move_field_range(
    record: &mut Record,
    source: Range<usize>,
    dest: usize,
) -> Result<(), EditError> {
    let len = record.len();
    if source.start > source.end || source.end > len {
        return Err(EditError::RangeOutOfBounds {
            object_type: record.object_type.clone(),
            start: source.start,
            end: source.end,
            len,
        });
    }
    let remaining = len - source.len();
    if dest > remaining {
        return Err(EditError::IndexOutOfRange {
            object_type: record.object_type.clone(),
            index: dest,
            len: remaining,
        });
    }

    tracing::trace!(
        object_type = %record.object_type,
        start = source.start,
        end = source.end,
        dest,
        "move field range"
    );
    let run: Vec<Field> = record.fields.drain(source).collect();
    record.fields.splice(dest..dest, run);
    Ok(())
}

/// Change the object type, leaving fields untouched
pub fn rename_object_type(record: &mut Record, new_type: impl Into<String>) {
    let new_type = new_type.into();
    tracing::trace!(from = %record.object_type, to = %new_type, "rename object type");
    record.object_type = new_type;
}

/// Rewrite a field through an exact-match table
///
/// Blank values are left alone. A non-blank value missing from the table is
/// kept and produces one warning, unless the table passes unmapped values
/// through. Values that stay valid are listed as identity entries.
///
/// # Errors
/// Returns [`EditError::IndexOutOfRange`] if `index >= len`
pub fn remap_enum_value(
    record: &mut Record,
    index: usize,
    table: &EnumRemap,
    diagnostics: &mut Diagnostics,
) -> Result<RemapOutcome, EditError> {
    let field = record
        .fields
        .get(index)
        .ok_or_else(|| EditError::index(record, index))?;
    if field.is_blank() {
        return Ok(RemapOutcome::Unchanged);
    }

    let current = field.to_string();
    if let Some(replacement) = table.get(&current) {
        tracing::trace!(
            object_type = %record.object_type,
            index,
            from = %current,
            to = replacement,
            "remap value"
        );
        let replacement = replacement.to_string();
        record.fields[index] = Field::Text(replacement.clone());
        return Ok(RemapOutcome::Remapped {
            from: current,
            to: replacement,
        });
    }

    if table.is_passthrough() {
        return Ok(RemapOutcome::Unchanged);
    }

    diagnostics.push(
        Diagnostic::new(
            Severity::Warning,
            format!("field {index} has unmapped value '{current}', left unchanged"),
        )
        .for_record(record.id, record.object_type.clone()),
    );
    Ok(RemapOutcome::Unmapped(current))
}

/// Set field `index` to the value computed by `derive` from the current fields
///
/// `derive` must be pure. If it returns an error or panics, an error
/// diagnostic is recorded and the field is left blank. Returns whether a
/// value was derived.
///
/// # Errors
/// Returns [`EditError::IndexOutOfRange`] if `index >= len`
pub fn compute_derived_field<F, E>(
    record: &mut Record,
    index: usize,
    derive: F,
    diagnostics: &mut Diagnostics,
) -> Result<bool, EditError>
where
    F: FnOnce(&[Field]) -> Result<Field, E>,
    E: Display,
{
    if index >= record.len() {
        return Err(EditError::index(record, index));
    }

    let fields = &record.fields;
    let outcome = catch_unwind(AssertUnwindSafe(|| derive(fields.as_slice())));
    let failure = match outcome {
        Ok(Ok(value)) => {
            tracing::trace!(object_type = %record.object_type, index, "derived field");
            record.fields[index] = value;
            return Ok(true);
        }
        Ok(Err(err)) => err.to_string(),
        Err(panic) => panic_message(panic.as_ref()),
    };

    record.fields[index] = Field::Blank;
    diagnostics.push(
        Diagnostic::new(
            Severity::Error,
            format!("could not derive field {index}, left blank: {failure}"),
        )
        .for_record(record.id, record.object_type.clone()),
    );
    Ok(false)
}

/// Overwrite field `index`, returning the previous value
///
/// # Errors
/// Returns [`EditError::IndexOutOfRange`] if `index >= len`
pub fn set_field(record: &mut Record, index: usize, value: Field) -> Result<Field, EditError> {
    let slot = match record.fields.get_mut(index) {
        Some(slot) => slot,
        None => return Err(EditError::index(record, index)),
    };
    Ok(std::mem::replace(slot, value))
}

/// Remove every field from `index` on, returning them in order
///
/// # Errors
/// Returns [`EditError::IndexOutOfRange`] if `index > len`
pub fn split_fields_off(record: &mut Record, index: usize) -> Result<Vec<Field>, EditError> {
    if index > record.len() {
        return Err(EditError::index(record, index));
    }
    Ok(record.fields.split_off(index))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

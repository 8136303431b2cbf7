//! The in-memory document: ordered records plus a declared schema version

use crate::{
    DocumentError, DocumentResult, Field, FieldLocation, Fingerprint, Record, RecordId,
};
use indexmap::IndexMap;
use modelver_schema::{SchemaAccessor, Version};
use serde::{Deserialize, Serialize};

/// An ordered collection of records declared against one schema version
///
/// Record order is insertion order and survives removals. Identities are
/// unique within a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    version: Version,
    records: IndexMap<RecordId, Record>,
}

#[derive(Serialize)]
struct DocumentView<'a> {
    version: Version,
    records: Vec<&'a Record>,
}

#[derive(Deserialize)]
struct DocumentRepr {
    version: Version,
    records: Vec<Record>,
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.view().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = DocumentRepr::deserialize(deserializer)?;
        let mut doc = Document::new(repr.version);
        for record in repr.records {
            doc.insert_record(record).map_err(serde::de::Error::custom)?;
        }
        Ok(doc)
    }
}

impl Document {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self {
            version,
            records: IndexMap::new(),
        }
    }

    /// Declared schema version
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Replace the declared version
    #[inline]
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Records in document order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// All records of `object_type`, in document order
    #[must_use]
    pub fn records_by_type(&self, object_type: &str) -> Vec<&Record> {
        self.records
            .values()
            .filter(|r| r.object_type == object_type)
            .collect()
    }

    /// Append a record with a fresh identity
    pub fn add_record(&mut self, object_type: impl Into<String>, fields: Vec<Field>) -> RecordId {
        let mut id = RecordId::new();
        while self.records.contains_key(&id) {
            id = RecordId::new();
        }
        self.records
            .insert(id, Record::new(id, object_type, fields));
        id
    }

    /// Append a record keeping its identity
    ///
    /// # Errors
    /// Returns [`DocumentError::DuplicateRecord`] if the identity is taken
    pub fn insert_record(&mut self, record: Record) -> DocumentResult<()> {
        if self.records.contains_key(&record.id) {
            return Err(DocumentError::DuplicateRecord(record.id));
        }
        self.records.insert(record.id, record);
        Ok(())
    }

    /// Remove a record, preserving the order of the rest
    ///
    /// References to the removed record held by other records are left as
    /// they are.
    pub fn remove_record(&mut self, id: RecordId) -> Option<Record> {
        self.records.shift_remove(&id)
    }

    /// Look up a referenced record
    ///
    /// # Errors
    /// Returns [`DocumentError::DanglingReference`] if `id` is not present
    pub fn resolve_reference(&self, id: RecordId) -> DocumentResult<&Record> {
        self.records
            .get(&id)
            .ok_or_else(|| DocumentError::dangling(id))
    }

    /// Record by identity
    #[inline]
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    /// Mutable record by identity
    #[inline]
    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.get_mut(&id)
    }

    /// Check if a record exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if document has no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Verify every reference field resolves
    ///
    /// # Errors
    /// Returns the first [`DocumentError::DanglingReference`] in document order
    pub fn check_references(&self) -> DocumentResult<()> {
        self.records.values().try_for_each(|r| self.check_record_references(r))
    }

    /// Full structural validation against the schema of the declared version
    ///
    /// Each record is checked for layout conformance, then for reference
    /// integrity. The first failure in document order is returned.
    ///
    /// # Errors
    /// Returns [`DocumentError::UnknownSchema`],
    /// [`DocumentError::StructuralInvariantViolation`] or
    /// [`DocumentError::DanglingReference`]
    pub fn validate<S>(&self, schema: &S) -> DocumentResult<()>
    where
        S: SchemaAccessor + ?Sized,
    {
        for record in self.records.values() {
            let layout = schema.object_schema(&record.object_type, &self.version)?;
            let len = record.len();
            if !layout.conforms(len) {
                let expected = layout.field_count();
                let reason = if layout.is_extensible() {
                    format!(
                        "has {len} fields, expected {expected} plus whole groups of {}",
                        layout.extensible_group_size()
                    )
                } else {
                    format!("has {len} fields, expected {expected}")
                };
                return Err(DocumentError::StructuralInvariantViolation {
                    record: record.id,
                    object_type: record.object_type.clone(),
                    field_index: len.min(expected),
                    reason,
                });
            }
            self.check_record_references(record)?;
        }
        Ok(())
    }

    /// Content fingerprint over version, order, identities and values
    ///
    /// # Errors
    /// Returns error if the document cannot be encoded
    pub fn fingerprint(&self) -> DocumentResult<Fingerprint> {
        Ok(Fingerprint::of_serializable(&self.view())?)
    }

    fn view(&self) -> DocumentView<'_> {
        DocumentView {
            version: self.version,
            records: self.records.values().collect(),
        }
    }

    fn check_record_references(&self, record: &Record) -> DocumentResult<()> {
        for (field_index, target) in record.references() {
            if !self.records.contains_key(&target) {
                return Err(DocumentError::DanglingReference {
                    target,
                    referrer: Some(FieldLocation {
                        record: record.id,
                        field_index,
                    }),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Record;
    type IntoIter = indexmap::map::Values<'a, RecordId, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

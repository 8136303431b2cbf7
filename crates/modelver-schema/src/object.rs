//! Field layout of one object type at one schema version

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Positional field layout of an object type at a specific version
///
/// Fixed fields come first. Types with an extensible group accept any
/// number of whole groups appended after the fixed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSchema {
    object_type: String,
    fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    extensible: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    choices: BTreeMap<usize, BTreeSet<String>>,
}

impl ObjectSchema {
    /// Create a schema with fixed fields only
    #[must_use]
    pub fn new<I, S>(object_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            object_type: object_type.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            extensible: Vec::new(),
            choices: BTreeMap::new(),
        }
    }

    /// Attach an extensible group
    #[must_use]
    pub fn with_extensible<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensible = group.into_iter().map(Into::into).collect();
        self
    }

    /// Attach the allowed value set of a fixed field
    #[must_use]
    pub fn with_choices<I, S>(mut self, index: usize, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices
            .insert(index, values.into_iter().map(Into::into).collect());
        self
    }

    /// Object type name
    #[inline]
    #[must_use]
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Number of fixed fields
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Ordered fixed field names
    #[inline]
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    /// Field names of the extensible group (empty when not extensible)
    #[inline]
    #[must_use]
    pub fn extensible_fields(&self) -> &[String] {
        &self.extensible
    }

    /// Width of one extensible group, zero when the type is not extensible
    #[inline]
    #[must_use]
    pub fn extensible_group_size(&self) -> usize {
        self.extensible.len()
    }

    /// Whether records of this type may carry extensible groups
    #[inline]
    #[must_use]
    pub fn is_extensible(&self) -> bool {
        !self.extensible.is_empty()
    }

    /// Whether a record with `len` fields conforms to this layout
    #[must_use]
    pub fn conforms(&self, len: usize) -> bool {
        let fixed = self.field_count();
        if self.is_extensible() {
            len >= fixed && (len - fixed) % self.extensible_group_size() == 0
        } else {
            len == fixed
        }
    }

    /// Allowed values of a fixed field, if the field is an enumeration
    #[inline]
    #[must_use]
    pub fn allowed_values(&self, index: usize) -> Option<&BTreeSet<String>> {
        self.choices.get(&index)
    }

    /// Position of a fixed field by name
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Name of the field at `index`, extensible positions included
    #[must_use]
    pub fn field_name(&self, index: usize) -> Option<&str> {
        if let Some(name) = self.fields.get(index) {
            return Some(name);
        }
        if !self.is_extensible() {
            return None;
        }
        let offset = (index - self.field_count()) % self.extensible_group_size();
        self.extensible.get(offset).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> ObjectSchema {
        ObjectSchema::new("OS:Surface", ["Name", "Surface Type", "Construction Name"])
            .with_extensible(["X", "Y", "Z"])
            .with_choices(1, ["Floor", "Wall", "RoofCeiling"])
    }

    #[test]
    fn fixed_layout_conformance() {
        let schema = ObjectSchema::new("OS:Boiler:Steam", ["Name", "Fuel Type"]);
        assert!(schema.conforms(2));
        assert!(!schema.conforms(1));
        assert!(!schema.conforms(3));
        assert_eq!(schema.extensible_group_size(), 0);
    }

    #[test]
    fn extensible_layout_conformance() {
        let schema = surface();
        assert!(schema.conforms(3));
        assert!(schema.conforms(6));
        assert!(schema.conforms(9));
        assert!(!schema.conforms(2));
        assert!(!schema.conforms(4));
        assert!(!schema.conforms(8));
    }

    #[test]
    fn field_lookup() {
        let schema = surface();
        assert_eq!(schema.field_index("Surface Type"), Some(1));
        assert_eq!(schema.field_index("Missing"), None);
        assert_eq!(schema.field_name(0), Some("Name"));
        assert_eq!(schema.field_name(4), Some("Y"));
        assert_eq!(schema.field_name(8), Some("Z"));
    }

    #[test]
    fn field_name_past_end_of_fixed_layout() {
        let schema = ObjectSchema::new("OS:Version", ["Version Identifier"]);
        assert_eq!(schema.field_name(5), None);
    }

    #[test]
    fn allowed_values_only_for_choice_fields() {
        let schema = surface();
        assert!(schema.allowed_values(1).unwrap().contains("Wall"));
        assert!(schema.allowed_values(0).is_none());
    }
}

//! Result rows with a separate relation namespace.
//!
//! A [`Record`] keeps plain fields and loaded relations in two distinct
//! maps. Column rules rely on telling them apart: a field may be edited while
//! a relation of the same name is loaded, but a loaded relation blocks adding
//! a column under that name.

use indexmap::{IndexMap, IndexSet};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// A loaded relation slot on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// To-one relation with a related record.
    One(Box<Record>),
    /// To-one relation that was loaded but matched nothing.
    Empty,
    /// To-many relation.
    Many(Vec<Record>),
    /// The relation was removed because the field was overwritten by a rule.
    Disassociated,
}

impl Relation {
    /// Render the relation as JSON. `Disassociated` has no representation.
    fn to_json(&self) -> Option<Value> {
        match self {
            Relation::One(record) => Some(record.to_json()),
            Relation::Empty => Some(Value::Null),
            Relation::Many(records) => Some(Value::Array(
                records.iter().map(Record::to_json).collect(),
            )),
            Relation::Disassociated => None,
        }
    }
}

/// One row of result data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Value>,
    relations: IndexMap<String, Relation>,
    derived: IndexSet<String>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field (builder form).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Attach a relation (builder form).
    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.set_relation(name, relation);
        self
    }

    /// Declare a field as derived (builder form).
    pub fn with_derived(mut self, name: impl Into<String>) -> Self {
        self.mark_derived(name);
        self
    }

    /// Get a field value. Absent fields return `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field, overwriting any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Whether the field is present and not null.
    pub fn has_value(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_null())
    }

    /// Iterate over plain fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up a relation slot, including the disassociated sentinel.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Whether a relation with this name is currently loaded.
    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations
            .get(name)
            .is_some_and(|r| !matches!(r, Relation::Disassociated))
    }

    /// Attach or replace a relation.
    pub fn set_relation(&mut self, name: impl Into<String>, relation: Relation) {
        self.relations.insert(name.into(), relation);
    }

    /// Replace a relation slot with the disassociated sentinel.
    ///
    /// Returns `false` when no relation slot existed under this name.
    pub fn disassociate(&mut self, name: &str) -> bool {
        match self.relations.get_mut(name) {
            Some(slot) => {
                *slot = Relation::Disassociated;
                true
            }
            None => false,
        }
    }

    /// Mark a field as derived (formula-backed).
    pub fn mark_derived(&mut self, name: impl Into<String>) {
        self.derived.insert(name.into());
    }

    /// Whether the field is derived.
    pub fn is_derived(&self, name: &str) -> bool {
        self.derived.contains(name)
    }

    /// Fields not shadowed by a loaded relation of the same name.
    fn visible_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields
            .iter()
            .filter(|(name, _)| !self.relation_loaded(name))
    }

    /// Loaded relations rendered as JSON.
    fn visible_relations(&self) -> impl Iterator<Item = (&String, Value)> {
        self.relations
            .iter()
            .filter_map(|(name, relation)| relation.to_json().map(|value| (name, value)))
    }

    /// Render the record as one JSON object: fields first, then loaded
    /// relations. A loaded relation replaces a field of the same name.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::with_capacity(self.fields.len() + self.relations.len());
        for (name, value) in self.visible_fields() {
            map.insert(name.clone(), value.clone());
        }
        for (name, value) in self.visible_relations() {
            map.insert(name.clone(), value);
        }
        Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.visible_fields() {
            map.serialize_entry(name, value)?;
        }
        for (name, value) in self.visible_relations() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

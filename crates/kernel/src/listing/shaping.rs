//! Shaping stage: declarative column edits and additions.
//!
//! Rules are registered per field name in two ordered registries, one for
//! edits and one for additions. Re-registering a field replaces its value but
//! keeps its position. For every record, all edits run first, then all
//! additions, each in registration order.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::error::ListError;
use super::page::Page;
use super::record::Record;

/// Per-row value function.
pub type ComputeFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// Value a rule writes: a constant or one computed from the row.
#[derive(Clone)]
pub enum RuleValue {
    Constant(Value),
    Computed(ComputeFn),
}

impl RuleValue {
    /// Rule value computed from each record.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Resolve the value for one record.
    pub fn resolve(&self, record: &Record) -> Value {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Computed(f) => f(record),
        }
    }
}

impl fmt::Debug for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

macro_rules! constant_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RuleValue {
                fn from(value: $ty) -> Self {
                    Self::Constant(Value::from(value))
                }
            }
        )*
    };
}

constant_from!(Value, String, &str, bool, i32, i64, u32, u64, f64);

/// Ordered registry of column rules keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct ColumnRules {
    rules: IndexMap<String, RuleValue>,
}

impl ColumnRules {
    /// Register a rule. The last registration for a field wins.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RuleValue>) {
        self.rules.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Applies edit and add rules to every record of a page.
#[derive(Debug, Clone, Default)]
pub struct Shaper {
    edit: ColumnRules,
    add: ColumnRules,
}

impl Shaper {
    pub fn new(edit: ColumnRules, add: ColumnRules) -> Self {
        Self { edit, add }
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.edit.is_empty() && self.add.is_empty()
    }

    /// Rules editing existing columns.
    pub fn edit_rules(&self) -> &ColumnRules {
        &self.edit
    }

    /// Rules adding new columns.
    pub fn add_rules(&self) -> &ColumnRules {
        &self.add
    }

    /// Apply all rules to every record of the page.
    ///
    /// Records are shaped into a new vector and swapped in only when every
    /// record succeeded. On error the page is left exactly as it was. Page
    /// metadata is never touched.
    pub fn apply_changes_to(&self, page: &mut Page) -> Result<(), ListError> {
        if self.is_empty() {
            return Ok(());
        }

        let shaped = page
            .records
            .iter()
            .map(|record| self.shape(record.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        page.replace_records(shaped);
        Ok(())
    }

    /// Apply all rules to one record.
    pub fn shape(&self, mut record: Record) -> Result<Record, ListError> {
        for (field, value) in self.edit.iter() {
            edit_column(&mut record, field, value)?;
        }
        for (field, value) in self.add.iter() {
            add_column(&mut record, field, value)?;
        }
        Ok(record)
    }
}

/// Overwrite a column. A relation under the same name is disassociated so
/// stale relation data never shadows the new scalar.
fn edit_column(record: &mut Record, field: &str, value: &RuleValue) -> Result<(), ListError> {
    if record.is_derived(field) {
        return Err(ListError::DerivedFieldEdit(field.to_string()));
    }

    let value = value.resolve(record);
    record.set(field, value);
    record.disassociate(field);
    Ok(())
}

/// Add a column. Fails if the name is taken by a loaded relation or a
/// non-null value.
fn add_column(record: &mut Record, field: &str, value: &RuleValue) -> Result<(), ListError> {
    if record.relation_loaded(field) || record.has_value(field) {
        return Err(ListError::ColumnAlreadyExists(field.to_string()));
    }

    // A loaded relation was rejected above, so there is nothing to disassociate.
    let value = value.resolve(record);
    record.set(field, value);
    Ok(())
}

//! In-memory data source.
//!
//! Evaluates ordering, filtering and paging over a fixed set of records.
//! Used for fixtures, tests, and small static tables.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;

use super::error::ListError;
use super::page::{Page, PageRequest};
use super::queryable::{ContainsPattern, Queryable, SortDirection};
use super::record::Record;

/// A predicate accumulated on a [`MemoryQueryable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Any of the fields contains the pattern.
    AnyLike {
        fields: Vec<String>,
        pattern: ContainsPattern,
    },
    /// The field equals the value.
    Equals { field: String, value: Value },
}

impl Condition {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::AnyLike { fields, pattern } => fields.iter().any(|field| {
                record
                    .get(field)
                    .and_then(searchable_text)
                    .is_some_and(|text| pattern.matches(&text))
            }),
            Condition::Equals { field, value } => record.get(field) == Some(value),
        }
    }
}

/// Query context over records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryable {
    rows: Vec<Record>,
    orderings: Vec<(String, SortDirection)>,
    conditions: Vec<Condition>,
}

impl MemoryQueryable {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Ordering clauses in the order they were appended.
    pub fn orderings(&self) -> &[(String, SortDirection)] {
        &self.orderings
    }

    /// Conditions in the order they were appended.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn matching(&self) -> Vec<&Record> {
        let mut rows: Vec<&Record> = self
            .rows
            .iter()
            .filter(|r| self.conditions.iter().all(|c| c.matches(r)))
            .collect();

        if !self.orderings.is_empty() {
            rows.sort_by(|a, b| {
                self.orderings
                    .iter()
                    .map(|(field, direction)| {
                        let ord = compare_values(a.get(field), b.get(field));
                        match direction {
                            SortDirection::Asc => ord,
                            SortDirection::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }
        rows
    }
}

#[async_trait]
impl Queryable for MemoryQueryable {
    fn order_by(&mut self, field: &str, direction: SortDirection) {
        self.orderings.push((field.to_string(), direction));
    }

    fn where_any_like(&mut self, fields: &[String], pattern: &ContainsPattern) {
        self.conditions.push(Condition::AnyLike {
            fields: fields.to_vec(),
            pattern: pattern.clone(),
        });
    }

    fn where_equals(&mut self, field: &str, value: Value) {
        self.conditions.push(Condition::Equals {
            field: field.to_string(),
            value,
        });
    }

    async fn paginate(&mut self, request: PageRequest) -> Result<Page, ListError> {
        let matching = self.matching();
        let total = matching.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);

        let records = matching
            .into_iter()
            .skip(offset)
            .take(request.per_page as usize)
            .cloned()
            .collect();

        Ok(Page::new(records, total, request))
    }
}

/// Text form of a scalar used for "contains" matching. Null and
/// structured values never match.
fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Total order over optional JSON values: absent/null < bool < number <
/// string < array < object. Arrays and objects compare by their JSON text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.total_cmp(&y)
                }
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) >= 4 && rank(a) == rank(b) => {
            x.to_string().cmp(&y.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

//! Abstract data source the pipeline drives.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ListError;
use super::page::{Page, PageRequest};

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A case-insensitive "contains" match.
///
/// Holds the raw needle. Each backend renders it in its own pattern syntax
/// and is responsible for escaping wildcard characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainsPattern {
    needle: String,
}

impl ContainsPattern {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }

    /// The raw text to search for.
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Render as a SQL `LIKE` pattern, escaping `\`, `%` and `_`.
    pub fn to_like(&self) -> String {
        format!("%{}%", escape_like_wildcards(&self.needle))
    }

    /// Case-insensitive substring test.
    pub fn matches(&self, haystack: &str) -> bool {
        haystack
            .to_lowercase()
            .contains(&self.needle.to_lowercase())
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
pub(crate) fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// A mutable query context over some data source.
///
/// Clauses accumulate until [`Queryable::paginate`] executes the query.
/// Every condition is combined with the others conjunctively.
#[async_trait]
pub trait Queryable: Send {
    /// Append an ordering clause. Earlier clauses take precedence.
    fn order_by(&mut self, field: &str, direction: SortDirection);

    /// Append a predicate matching rows where ANY of `fields` contains the pattern.
    fn where_any_like(&mut self, fields: &[String], pattern: &ContainsPattern);

    /// Append an equality predicate.
    fn where_equals(&mut self, field: &str, value: serde_json::Value);

    /// Execute the query and return one page plus the total match count.
    async fn paginate(&mut self, request: PageRequest) -> Result<Page, ListError>;
}

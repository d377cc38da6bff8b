//! Inbound listing parameters.
//!
//! The pipeline reads exactly five request fields: `sort`, `filter`,
//! `searchable`, `per_page` and `page`. Anything that can answer
//! [`RequestAccessor`] queries can feed a listing; [`QueryParams`] covers
//! decoded query strings.

use indexmap::IndexMap;

/// Request field holding the sort directive.
pub const SORT_FIELD: &str = "sort";
/// Request field holding the free-text filter.
pub const FILTER_FIELD: &str = "filter";
/// Request field holding the searchable field list.
pub const SEARCHABLE_FIELD: &str = "searchable";
/// Request field holding the requested page size.
pub const PER_PAGE_FIELD: &str = "per_page";
/// Request field holding the requested page number.
pub const PAGE_FIELD: &str = "page";

/// A raw request field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Single value.
    Text(String),
    /// Repeated value.
    List(Vec<String>),
}

impl FieldValue {
    /// Value as text. A repeated key yields its last value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::List(items) => items.last().map(String::as_str),
        }
    }

    /// All values as a list. Text is split on commas.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            FieldValue::Text(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
            FieldValue::List(items) => items.clone(),
        }
    }
}

/// Read access to the fields of an inbound request.
pub trait RequestAccessor {
    /// Whether the field was supplied.
    fn has_field(&self, name: &str) -> bool;

    /// Get a field value.
    fn get_field(&self, name: &str) -> Option<FieldValue>;

    /// Whether every named field was supplied.
    fn has_all_fields(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.has_field(name))
    }
}

/// Decoded query-string parameters.
///
/// Repeated keys, and keys written as `name[]`, collect into a list.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    values: IndexMap<String, FieldValue>,
}

impl QueryParams {
    /// Build from decoded `(key, value)` pairs, preserving order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: IndexMap<String, FieldValue> = IndexMap::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            let (name, bracketed) = match key.strip_suffix("[]") {
                Some(name) => (name.to_string(), true),
                None => (key, false),
            };

            match values.get_mut(&name) {
                Some(FieldValue::List(items)) => items.push(value),
                Some(slot) => {
                    let first = slot.as_text().unwrap_or_default().to_string();
                    *slot = FieldValue::List(vec![first, value]);
                }
                None if bracketed => {
                    values.insert(name, FieldValue::List(vec![value]));
                }
                None => {
                    values.insert(name, FieldValue::Text(value));
                }
            }
        }
        Self { values }
    }
}

impl RequestAccessor for QueryParams {
    fn has_field(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn get_field(&self, name: &str) -> Option<FieldValue> {
        self.values.get(name).cloned()
    }
}

/// The listing inputs extracted from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Sort directive, `"<field>|<direction>"`.
    pub sort: Option<String>,

    /// Free-text filter.
    pub filter: Option<String>,

    /// Fields the filter is matched against, in order.
    pub searchable: Vec<String>,

    /// Requested page size, unparsed.
    pub per_page: Option<String>,

    /// Requested page number, unparsed.
    pub page: Option<String>,
}

impl ListRequest {
    /// Extract listing inputs from any request accessor.
    pub fn from_accessor<R: RequestAccessor + ?Sized>(request: &R) -> Self {
        let text = |name: &str| {
            request
                .get_field(name)
                .and_then(|v| v.as_text().map(str::to_string))
        };

        let searchable = request
            .get_field(SEARCHABLE_FIELD)
            .map(|v| v.to_list())
            .unwrap_or_default()
            .into_iter()
            .filter(|f| !f.trim().is_empty())
            .collect();

        Self {
            sort: text(SORT_FIELD),
            filter: text(FILTER_FIELD),
            searchable,
            per_page: text(PER_PAGE_FIELD),
            page: text(PAGE_FIELD),
        }
    }

    /// Set the sort directive (builder form).
    pub fn sort(mut self, directive: impl Into<String>) -> Self {
        self.sort = Some(directive.into());
        self
    }

    /// Set the filter text and the fields it searches (builder form).
    pub fn filter<I, S>(mut self, text: impl Into<String>, searchable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(text.into());
        self.searchable = searchable.into_iter().map(Into::into).collect();
        self
    }

    /// Set the requested page size (builder form).
    pub fn per_page(mut self, per_page: impl Into<String>) -> Self {
        self.per_page = Some(per_page.into());
        self
    }

    /// Set the requested page number (builder form).
    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }
}

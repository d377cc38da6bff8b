//! Filter stage: match the filter text against any searchable field.

use super::queryable::{ContainsPattern, Queryable};
use super::request::ListRequest;

/// Apply the request's free-text filter to the query.
///
/// Appends one compound predicate (OR across `searchable`, each a
/// case-insensitive "contains" match) when both the filter and the field
/// list are non-empty. The filter text is matched as given, surrounding
/// whitespace included. Returns whether a predicate was added.
pub fn apply_filter<Q: Queryable + ?Sized>(request: &ListRequest, query: &mut Q) -> bool {
    let Some(text) = request.filter.as_deref().filter(|t| !t.is_empty()) else {
        return false;
    };

    let fields: Vec<String> = request
        .searchable
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    if fields.is_empty() {
        return false;
    }

    tracing::debug!(filter = text, fields = ?fields, "applying filter");
    query.where_any_like(&fields, &ContainsPattern::new(text));
    true
}

//! Sort stage: `sort=<field>|<direction>`.

use super::error::ListError;
use super::queryable::{Queryable, SortDirection};
use super::request::ListRequest;

/// Separator between field and direction.
const SEPARATOR: char = '|';

/// A parsed sort directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    /// Field to sort by.
    pub field: String,

    /// Sort direction, normalized from any case.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Parse `"<field>|<direction>"`.
    ///
    /// Exactly one separator, a non-empty field and an `asc`/`desc` direction
    /// (any case) are required.
    pub fn parse(raw: &str) -> Result<Self, ListError> {
        let malformed = || ListError::MalformedSort(raw.to_string());

        let mut parts = raw.split(SEPARATOR);
        let (Some(field), Some(direction), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let field = field.trim();
        if field.is_empty() {
            return Err(malformed());
        }
        let direction = SortDirection::parse(direction.trim()).ok_or_else(malformed)?;

        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Apply the request's sort directive to the query.
///
/// Without a `sort` parameter the query is left unchanged. The directive is
/// parsed before the query is touched, so a malformed one leaves no ordering
/// clause behind.
pub fn apply_sort<Q: Queryable + ?Sized>(
    request: &ListRequest,
    query: &mut Q,
) -> Result<Option<SortDirective>, ListError> {
    let Some(raw) = request.sort.as_deref() else {
        return Ok(None);
    };

    let directive = SortDirective::parse(raw)?;
    tracing::debug!(field = %directive.field, direction = %directive.direction, "applying sort");
    query.order_by(&directive.field, directive.direction);
    Ok(Some(directive))
}

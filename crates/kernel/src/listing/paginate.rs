//! Pagination stage: resolve page coordinates and execute the query.

use super::error::ListError;
use super::page::{Page, PageRequest};
use super::queryable::Queryable;
use super::request::ListRequest;

/// Page size when the request does not supply a usable one.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Resolve the page size. Absent, zero, negative or non-numeric values fall
/// back to [`DEFAULT_PER_PAGE`].
pub fn resolve_per_page(raw: Option<&str>) -> u32 {
    parse_positive(raw).unwrap_or(DEFAULT_PER_PAGE)
}

/// Resolve the page number, defaulting to the first page.
pub fn resolve_page(raw: Option<&str>) -> u32 {
    parse_positive(raw).unwrap_or(1)
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

/// Resolve page coordinates, capping the page size at `max_per_page`.
pub fn page_request(request: &ListRequest, max_per_page: Option<u32>) -> PageRequest {
    let mut per_page = resolve_per_page(request.per_page.as_deref());
    if let Some(max) = max_per_page
        && per_page > max
    {
        tracing::warn!(
            requested = per_page,
            capped = max,
            "per_page exceeds maximum, capping"
        );
        per_page = max;
    }

    PageRequest {
        page: resolve_page(request.page.as_deref()),
        per_page,
    }
}

/// Execute the query for the resolved page. This is the pipeline's only
/// suspension point.
pub async fn paginate<Q: Queryable + ?Sized>(
    query: &mut Q,
    request: PageRequest,
) -> Result<Page, ListError> {
    let page = query.paginate(request).await?;
    tracing::debug!(
        page = page.page,
        per_page = page.per_page,
        total = page.total,
        returned = page.records.len(),
        "page materialized"
    );
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_page_defaults() {
        assert_eq!(resolve_per_page(None), 15);
        assert_eq!(resolve_per_page(Some("0")), 15);
        assert_eq!(resolve_per_page(Some("-3")), 15);
        assert_eq!(resolve_per_page(Some("lots")), 15);
        assert_eq!(resolve_per_page(Some("2.5")), 15);
        assert_eq!(resolve_per_page(Some("7")), 7);
        assert_eq!(resolve_per_page(Some(" 7 ")), 7);
    }

    #[test]
    fn page_defaults_to_first() {
        assert_eq!(resolve_page(None), 1);
        assert_eq!(resolve_page(Some("0")), 1);
        assert_eq!(resolve_page(Some("x")), 1);
        assert_eq!(resolve_page(Some("4")), 4);
    }

    #[test]
    fn per_page_capped() {
        let request = ListRequest::default().per_page("500").page("2");
        let resolved = page_request(&request, Some(100));
        assert_eq!(resolved, PageRequest { page: 2, per_page: 100 });

        let uncapped = page_request(&request, None);
        assert_eq!(uncapped.per_page, 500);
    }
}

//! List API routes.
//!
//! `GET /api/list/{table}` drives sorting, searching and paging for a
//! data-grid front end purely through query parameters:
//! `sort=<field>|<asc|desc>`, `filter=<text>`, `searchable[]=<field>`,
//! `per_page=<n>`, `page=<n>`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::error::{AppError, AppResult};
use crate::listing::{ListRequest, Page, QueryParams};
use crate::state::AppState;

/// Create the list router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/list/{table}", get(list_table))
}

async fn list_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<Page>> {
    let listing = state.listings().get(&table).ok_or(AppError::NotFound)?;

    let request = ListRequest::from_accessor(&QueryParams::from_pairs(pairs));
    let page = listing
        .plan()
        .run(&request, listing.queryable(state.db().clone()))
        .await
        .map_err(|e| {
            tracing::debug!(table = %table, error = %e, "listing failed");
            AppError::from(e)
        })?;

    tracing::info!(
        table = %table,
        page = page.page,
        per_page = page.per_page,
        total = page.total,
        "listing served"
    );
    Ok(Json(page))
}

//! Tabula Kernel Library
//!
//! Listing pipeline, data sources, and the HTTP surface that exposes them.
//! The main entry point for running the server is the `tabula` binary.

pub mod catalog;
pub mod config;
pub mod error;
pub mod listing;
pub mod routes;
pub mod state;

use axum::Router;

pub use catalog::{ListingCatalog, TableListing};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

/// Build the application router with all routes mounted.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::listing::router())
        .with_state(state)
}

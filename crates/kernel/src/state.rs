//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::catalog::ListingCatalog;
use crate::config::Config;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap. Nothing in here is mutated
/// after startup; every request builds its own query context.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Tables the list endpoint may serve.
    listings: ListingCatalog,
}

impl AppState {
    /// Connect to PostgreSQL and build the state.
    pub async fn new(config: &Config, listings: ListingCatalog) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("failed to connect to PostgreSQL")?;

        Ok(Self::from_parts(db, listings))
    }

    /// Build the state from an existing pool.
    pub fn from_parts(db: PgPool, listings: ListingCatalog) -> Self {
        Self {
            inner: Arc::new(AppStateInner { db, listings }),
        }
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn listings(&self) -> &ListingCatalog {
        &self.inner.listings
    }

    /// Check if the database connection is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.inner.db).await.is_ok()
    }
}

//! Tables exposed through the list endpoint.
//!
//! Each entry pairs a table with the plan that shapes its pages and the
//! SQL-side extras (derived columns, relations, fixed scopes) its queries
//! carry. Only registered tables can be listed.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use sqlx::PgPool;

use crate::config::Config;
use crate::listing::{
    ListingBuilder, ListingPlan, Queryable, RelationSpec, SqlQueryable, is_safe_identifier,
};

/// Listing configuration for one table.
#[derive(Debug, Clone)]
pub struct TableListing {
    table: String,
    plan: ListingPlan,
    derived: Vec<(String, String)>,
    relations: Vec<RelationSpec>,
    scope: Vec<(String, Value)>,
}

impl TableListing {
    /// List `table` with the given plan.
    pub fn new(table: impl Into<String>, plan: ListingPlan) -> Self {
        Self {
            table: table.into(),
            plan,
            derived: Vec::new(),
            relations: Vec::new(),
            scope: Vec::new(),
        }
    }

    /// Select a derived field computed by a SQL expression.
    pub fn derived(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.derived.push((name.into(), expression.into()));
        self
    }

    /// Eager-load a relation.
    pub fn with_relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }

    /// Restrict every listing to rows where `field = value`.
    pub fn scope(mut self, field: impl Into<String>, value: Value) -> Self {
        self.scope.push((field.into(), value));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn plan(&self) -> &ListingPlan {
        &self.plan
    }

    /// Build a fresh query context for one request.
    pub fn queryable(&self, pool: PgPool) -> SqlQueryable {
        let mut query = SqlQueryable::new(pool, self.table.clone());
        for (name, expression) in &self.derived {
            query = query.derived(name.clone(), expression.clone());
        }
        for relation in &self.relations {
            query = query.with_relation(relation.clone());
        }
        for (field, value) in &self.scope {
            query.where_equals(field, value.clone());
        }
        query
    }
}

/// Registered tables, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct ListingCatalog {
    tables: HashMap<String, Arc<TableListing>>,
}

impl ListingCatalog {
    /// Register every configured table with a plain plan.
    ///
    /// Names that are not safe SQL identifiers are skipped with a warning.
    pub fn from_config(config: &Config) -> Self {
        let mut catalog = Self::default();
        for table in &config.listing_tables {
            if !is_safe_identifier(table) {
                tracing::warn!(table = %table, "ignoring unsafe listing table name");
                continue;
            }
            let plan = ListingBuilder::new()
                .max_per_page(config.listing_max_per_page)
                .build();
            catalog.register(TableListing::new(table.clone(), plan));
        }
        catalog
    }

    /// Register or replace a table listing.
    pub fn register(&mut self, listing: TableListing) {
        self.tables
            .insert(listing.table.clone(), Arc::new(listing));
    }

    pub fn get(&self, table: &str) -> Option<Arc<TableListing>> {
        self.tables.get(table).cloned()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

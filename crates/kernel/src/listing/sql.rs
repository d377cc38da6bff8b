//! PostgreSQL data source.
//!
//! [`SqlListQuery`] generates SQL with SeaQuery from the accumulated
//! clauses; [`SqlQueryable`] executes it with sqlx:
//! - count and page queries in one transaction with a statement timeout
//! - derived columns selected from SQL expressions
//! - relations eager-loaded with one batched query each

use std::collections::HashSet;

use async_trait::async_trait;
use indexmap::IndexMap;
use sea_query::extension::postgres::PgExpr;
use sea_query::{
    Alias, Asterisk, Cond, Expr, Order, PostgresQueryBuilder, Query, SelectStatement, SimpleExpr,
};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use super::error::ListError;
use super::page::{Page, PageRequest};
use super::queryable::{ContainsPattern, Queryable, SortDirection};
use super::record::{Record, Relation};

/// Statement timeout applied to every listing transaction.
const STATEMENT_TIMEOUT: &str = "SET LOCAL statement_timeout = '10s'";

/// SQLSTATE for a reference to a column that does not exist.
const UNDEFINED_COLUMN: &str = "42703";

/// Classify a query failure. Unknown columns are the caller's fault.
fn storage_error(err: sqlx::Error) -> ListError {
    if let Some(db) = err.as_database_error()
        && db.code().as_deref() == Some(UNDEFINED_COLUMN)
    {
        return ListError::UnknownField(db.message().to_string());
    }
    ListError::Database(err)
}

/// Validate a SQL identifier name (table/column names).
/// Allows only `[a-zA-Z_][a-zA-Z0-9_]*` with max 63 chars (PostgreSQL limit).
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

fn ensure_identifier(name: &str) -> Result<(), ListError> {
    if is_safe_identifier(name) {
        Ok(())
    } else {
        Err(ListError::UnsafeIdentifier(
            name.chars().take(64).collect(),
        ))
    }
}

/// A condition accumulated on the SQL query.
#[derive(Debug, Clone)]
enum SqlCondition {
    AnyLike {
        fields: Vec<String>,
        pattern: ContainsPattern,
    },
    Equals {
        field: String,
        value: Value,
    },
}

/// SQL generator for a listing over one table.
#[derive(Debug, Clone)]
pub struct SqlListQuery {
    table: String,
    derived: IndexMap<String, String>,
    orderings: Vec<(String, SortDirection)>,
    conditions: Vec<SqlCondition>,
}

impl SqlListQuery {
    /// Create a query over `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            derived: IndexMap::new(),
            orderings: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Select `expression AS name` and treat `name` as a derived field.
    ///
    /// The expression is trusted SQL supplied by the application, never by
    /// the request.
    pub fn derived(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.derived.insert(name.into(), expression.into());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Names of derived fields.
    pub fn derived_fields(&self) -> impl Iterator<Item = &str> {
        self.derived.keys().map(String::as_str)
    }

    pub fn order_by(&mut self, field: &str, direction: SortDirection) {
        self.orderings.push((field.to_string(), direction));
    }

    pub fn where_any_like(&mut self, fields: &[String], pattern: &ContainsPattern) {
        self.conditions.push(SqlCondition::AnyLike {
            fields: fields.to_vec(),
            pattern: pattern.clone(),
        });
    }

    pub fn where_equals(&mut self, field: &str, value: Value) {
        self.conditions.push(SqlCondition::Equals {
            field: field.to_string(),
            value,
        });
    }

    /// Build the main SELECT query with pagination.
    pub fn build(&self, request: PageRequest) -> Result<String, ListError> {
        let mut query = Query::select();

        self.add_select_fields(&mut query)?;
        query.from(Alias::new(&self.table));
        self.add_filters(&mut query)?;
        self.add_sorts(&mut query)?;

        query.limit(u64::from(request.per_page));
        query.offset(request.offset());

        Ok(query.to_string(PostgresQueryBuilder))
    }

    /// Build a COUNT query over the filtered, unpaginated result set.
    pub fn build_count(&self) -> Result<String, ListError> {
        let mut query = Query::select();

        ensure_identifier(&self.table)?;
        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(&self.table));
        self.add_filters(&mut query)?;

        Ok(query.to_string(PostgresQueryBuilder))
    }

    fn add_select_fields(&self, query: &mut SelectStatement) -> Result<(), ListError> {
        ensure_identifier(&self.table)?;
        query.column((Alias::new(&self.table), Asterisk));
        for (name, expression) in &self.derived {
            ensure_identifier(name)?;
            query.expr_as(Expr::cust(expression.clone()), Alias::new(name));
        }
        Ok(())
    }

    fn add_filters(&self, query: &mut SelectStatement) -> Result<(), ListError> {
        for condition in &self.conditions {
            let expr = match condition {
                SqlCondition::AnyLike { fields, pattern } => {
                    let mut any = Cond::any();
                    for field in fields {
                        let text = Expr::expr(self.field_expr(field)?).cast_as(Alias::new("text"));
                        any = any.add(Expr::expr(text).ilike(pattern.to_like()));
                    }
                    any.into()
                }
                SqlCondition::Equals { field, value } => {
                    equals_expr(self.field_expr(field)?, value)
                }
            };
            query.and_where(expr);
        }
        Ok(())
    }

    fn add_sorts(&self, query: &mut SelectStatement) -> Result<(), ListError> {
        for (field, direction) in &self.orderings {
            let order = match direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query.order_by_expr(self.field_expr(field)?, order);
        }
        Ok(())
    }

    /// Expression for a field: the derived expression, or the qualified column.
    fn field_expr(&self, field: &str) -> Result<SimpleExpr, ListError> {
        if let Some(expression) = self.derived.get(field) {
            return Ok(Expr::cust(expression.clone()));
        }
        ensure_identifier(field)?;
        Ok(Expr::col((Alias::new(&self.table), Alias::new(field))).into())
    }
}

fn equals_expr(column: SimpleExpr, value: &Value) -> SimpleExpr {
    let column = Expr::expr(column);
    match value {
        Value::Null => column.is_null(),
        Value::Bool(b) => column.eq(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => column.eq(i),
            None => column.eq(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => column.eq(s.as_str()),
        other => column.eq(other.to_string()),
    }
}

/// Relation cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    One,
    Many,
}

/// A relation eager-loaded onto every record of a page.
#[derive(Debug, Clone)]
pub struct RelationSpec {
    /// Relation name on the parent record.
    pub name: String,

    /// Table holding related rows.
    pub table: String,

    /// Parent field holding the key.
    pub local_field: String,

    /// Child field matched against the parent key.
    pub foreign_field: String,

    pub kind: RelationKind,
}

impl RelationSpec {
    /// To-one relation: `parent.local_field = table.foreign_field`.
    pub fn one(
        name: impl Into<String>,
        table: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            kind: RelationKind::One,
        }
    }

    /// To-many relation: `parent.local_field = table.foreign_field`.
    pub fn many(
        name: impl Into<String>,
        table: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::Many,
            ..Self::one(name, table, local_field, foreign_field)
        }
    }

    /// Build the batched child query for a set of parent keys.
    pub fn build(&self, keys: &[String]) -> Result<String, ListError> {
        ensure_identifier(&self.table)?;
        ensure_identifier(&self.foreign_field)?;

        let column = Expr::col((Alias::new(&self.table), Alias::new(&self.foreign_field)));
        let query = Query::select()
            .column((Alias::new(&self.table), Asterisk))
            .from(Alias::new(&self.table))
            .and_where(
                Expr::expr(column.cast_as(Alias::new("text"))).is_in(keys.iter().cloned()),
            )
            .to_owned();

        Ok(query.to_string(PostgresQueryBuilder))
    }

    /// Attach matching children to each parent.
    fn distribute(&self, parents: &mut [Record], children: &[Record]) {
        for parent in parents.iter_mut() {
            let key = parent.get(&self.local_field).and_then(key_text);
            let mut matching = children.iter().filter(|child| {
                key.is_some() && child.get(&self.foreign_field).and_then(key_text) == key
            });

            let relation = match self.kind {
                RelationKind::One => matching
                    .next()
                    .map(|child| Relation::One(Box::new(child.clone())))
                    .unwrap_or(Relation::Empty),
                RelationKind::Many => Relation::Many(matching.cloned().collect()),
            };
            parent.set_relation(self.name.clone(), relation);
        }
    }
}

/// Text form of a join key.
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Wrap a statement so each row comes back as JSON text in column order.
fn json_rows(sql: &str) -> String {
    format!("SELECT row_to_json(t)::text FROM ({sql}) t")
}

/// Decode one JSON-text row, keeping column order.
fn decode_row(row: &str) -> Result<Record, ListError> {
    let fields: IndexMap<String, Value> = serde_json::from_str(row)?;
    Ok(fields
        .into_iter()
        .fold(Record::new(), |record, (name, value)| record.with_field(name, value)))
}

/// Query context over a PostgreSQL table.
pub struct SqlQueryable {
    pool: PgPool,
    query: SqlListQuery,
    relations: Vec<RelationSpec>,
}

impl SqlQueryable {
    /// Create a queryable over `table`.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            query: SqlListQuery::new(table),
            relations: Vec::new(),
        }
    }

    /// Select a derived field. See [`SqlListQuery::derived`].
    pub fn derived(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.query = self.query.derived(name, expression);
        self
    }

    /// Eager-load a relation onto every record of the page.
    pub fn with_relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }

    /// The SQL generator, for inspection.
    pub fn sql(&self) -> &SqlListQuery {
        &self.query
    }

    /// Relations loaded onto every page.
    pub fn relations(&self) -> &[RelationSpec] {
        &self.relations
    }

    async fn load_relation(
        conn: &mut PgConnection,
        relation: &RelationSpec,
        records: &mut [Record],
    ) -> Result<(), ListError> {
        let mut seen = HashSet::new();
        let keys: Vec<String> = records
            .iter()
            .filter_map(|r| r.get(&relation.local_field).and_then(key_text))
            .filter(|k| seen.insert(k.clone()))
            .collect();

        if keys.is_empty() {
            relation.distribute(records, &[]);
            return Ok(());
        }

        let sql = relation.build(&keys)?;
        let rows: Vec<String> = sqlx::query_scalar(&json_rows(&sql))
            .fetch_all(&mut *conn)
            .await
            .map_err(storage_error)?;
        let children = rows
            .into_iter()
            .map(|row| decode_row(&row))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            relation = %relation.name,
            parents = keys.len(),
            children = children.len(),
            "relation loaded"
        );
        relation.distribute(records, &children);
        Ok(())
    }
}

#[async_trait]
impl Queryable for SqlQueryable {
    fn order_by(&mut self, field: &str, direction: SortDirection) {
        self.query.order_by(field, direction);
    }

    fn where_any_like(&mut self, fields: &[String], pattern: &ContainsPattern) {
        self.query.where_any_like(fields, pattern);
    }

    fn where_equals(&mut self, field: &str, value: Value) {
        self.query.where_equals(field, value);
    }

    async fn paginate(&mut self, request: PageRequest) -> Result<Page, ListError> {
        let count_sql = self.query.build_count()?;
        let main_sql = self.query.build(request)?;

        // SET LOCAL only applies inside a transaction and resets on commit.
        let mut tx = self.pool.begin().await?;
        sqlx::query(STATEMENT_TIMEOUT).execute(&mut *tx).await?;

        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error)?;
        let rows: Vec<String> = sqlx::query_scalar(&json_rows(&main_sql))
            .fetch_all(&mut *tx)
            .await
            .map_err(storage_error)?;

        let mut records = rows
            .into_iter()
            .map(|row| {
                let mut record = decode_row(&row)?;
                for name in self.query.derived_fields() {
                    record.mark_derived(name);
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>, ListError>>()?;

        for relation in &self.relations {
            Self::load_relation(&mut *tx, relation, &mut records).await?;
        }

        tx.commit().await?;

        Ok(Page::new(
            records,
            u64::try_from(total).unwrap_or_default(),
            request,
        ))
    }
}

#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for PostgreSQL-backed integration tests.
//!
//! A single [`TestApp`] is shared across all tests via [`shared_app`]. It
//! seeds two fixture tables and mounts the real router over them. When
//! `DATABASE_URL` is not set, [`shared_app`] returns `None` and the calling
//! test returns early.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use tabula_kernel::listing::{ListingBuilder, ListingPlan, RelationSpec};
use tabula_kernel::{AppState, ListingCatalog, TableListing};
use tabula_test_utils::smith_customers;

/// Fixture table of customers.
pub const CUSTOMERS: &str = "tabula_test_customer";

/// Fixture table of authors referenced by `author_id`.
pub const AUTHORS: &str = "tabula_test_author";

/// Shared Tokio runtime that outlives all individual test runtimes.
///
/// The pool is opened on this runtime, so every test body must run on it
/// too (see [`run_test`]).
pub static SHARED_RT: std::sync::LazyLock<tokio::runtime::Runtime> =
    std::sync::LazyLock::new(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to build shared test runtime")
    });

static SHARED_APP: std::sync::OnceLock<Option<TestApp>> = std::sync::OnceLock::new();

/// Get the shared [`TestApp`], or `None` when no database is configured.
pub async fn shared_app() -> Option<&'static TestApp> {
    SHARED_APP
        .get_or_init(|| {
            dotenvy::dotenv().ok();
            let url = std::env::var("DATABASE_URL").ok()?;

            let handle = SHARED_RT.handle().clone();
            let app = std::thread::spawn(move || handle.block_on(TestApp::new(&url)))
                .join()
                .expect("TestApp init thread panicked");
            Some(app)
        })
        .as_ref()
        .or_else(|| {
            eprintln!("DATABASE_URL not set; skipping PostgreSQL test");
            None
        })
}

/// Run an async test body on [`SHARED_RT`].
pub fn run_test<F: std::future::Future<Output = ()> + Send>(f: F) {
    SHARED_RT.block_on(f);
}

/// Listing over the customer fixture with its derived price, author
/// relation and active-only scope.
pub fn customer_listing(plan: ListingPlan) -> TableListing {
    TableListing::new(CUSTOMERS, plan)
        .derived(
            "total_price",
            format!("\"{CUSTOMERS}\".\"quantity\" * \"{CUSTOMERS}\".\"unit_price\""),
        )
        .with_relation(RelationSpec::one("author", AUTHORS, "author_id", "id"))
        .scope("active", json!(true))
}

/// Test application over the real router and a seeded database.
pub struct TestApp {
    router: Router,
    pub db: PgPool,
}

impl TestApp {
    async fn new(url: &str) -> Self {
        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .expect("Failed to connect to PostgreSQL");

        seed(&db).await;

        let mut catalog = ListingCatalog::default();
        catalog.register(customer_listing(
            ListingBuilder::new().max_per_page(50).build(),
        ));

        let router = tabula_kernel::app(AppState::from_parts(db.clone(), catalog));
        Self { router, db }
    }

    /// Send a GET request and decode the body as JSON (or a JSON string).
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }
}

/// Recreate and fill the fixture tables.
///
/// Customers are the twelve-of-twenty "smith" set, plus one inactive
/// "smith" row that the listing scope must hide. Even ids belong to author
/// 100, odd ids to author 200.
async fn seed(db: &PgPool) {
    for statement in [
        format!("DROP TABLE IF EXISTS {CUSTOMERS}"),
        format!("DROP TABLE IF EXISTS {AUTHORS}"),
        format!("CREATE TABLE {AUTHORS} (id BIGINT PRIMARY KEY, name TEXT NOT NULL)"),
        format!(
            "CREATE TABLE {CUSTOMERS} (
                id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                age BIGINT NOT NULL,
                nickname TEXT,
                author_id BIGINT,
                quantity BIGINT NOT NULL,
                unit_price BIGINT NOT NULL,
                active BOOLEAN NOT NULL
            )"
        ),
        format!("INSERT INTO {AUTHORS} (id, name) VALUES (100, 'Byron'), (200, 'Lovelace')"),
    ] {
        sqlx::query(&statement).execute(db).await.unwrap();
    }

    let insert = format!(
        "INSERT INTO {CUSTOMERS}
            (id, name, email, age, author_id, quantity, unit_price, active)
         VALUES ($1, $2, $3, $4, $5, $6, 10, $7)"
    );
    for record in smith_customers() {
        let id = record.get("id").and_then(Value::as_i64).unwrap();
        sqlx::query(&insert)
            .bind(id)
            .bind(record.get("name").and_then(Value::as_str).unwrap())
            .bind(record.get("email").and_then(Value::as_str).unwrap())
            .bind(record.get("age").and_then(Value::as_i64).unwrap())
            .bind(if id % 2 == 0 { 100_i64 } else { 200_i64 })
            .bind(id)
            .bind(true)
            .execute(db)
            .await
            .unwrap();
    }

    sqlx::query(&insert)
        .bind(21_i64)
        .bind("Zed Smith")
        .bind("zed@example.com")
        .bind(99_i64)
        .bind(100_i64)
        .bind(21_i64)
        .bind(false)
        .execute(db)
        .await
        .unwrap();
}

#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Listing pipeline integration tests.
//!
//! Drives the full Sort → Filter → Paginate → Shape pipeline against the
//! in-memory data source.

use serde_json::{Value, json};
use tabula_kernel::listing::{
    ListError, ListRequest, ListingBuilder, ListingPlan, MemoryQueryable, QueryParams, Queryable,
    Record, Relation, RuleValue, SortDirection,
};
use tabula_test_utils::{assert, customer_table, smith_table, test_customer};

// -------------------------------------------------------------------------
// End-to-end
// -------------------------------------------------------------------------

#[tokio::test]
async fn sorted_filtered_first_page() {
    let params = QueryParams::from_pairs([
        ("sort", "age|desc"),
        ("filter", "smith"),
        ("searchable[]", "name"),
        ("searchable[]", "email"),
        ("per_page", "5"),
    ]);
    let request = ListRequest::from_accessor(&params);

    let page = ListingPlan::default()
        .run(&request, smith_table())
        .await
        .unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 5);
    assert_eq!(page.total, 12);
    assert_eq!(page.records.len(), 5);
    assert::sorted_desc(&page, "age");
    assert::all_contain(&page, &["name", "email"], "smith");
    assert_eq!(page.last_page(), 3);
}

#[tokio::test]
async fn last_page_of_filtered_results() {
    let request = ListRequest::default()
        .sort("age|desc")
        .filter("smith", ["name", "email"])
        .per_page("5")
        .page("3");

    let page = ListingPlan::default()
        .run(&request, smith_table())
        .await
        .unwrap();

    assert_eq!(page.total, 12);
    assert_eq!(page.records.len(), 2);
    assert!(!page.has_next());
    assert!(page.has_prev());
}

#[tokio::test]
async fn filter_and_caller_scope_combine() {
    let mut query = smith_table();
    query.where_equals("age", json!(29));

    let request = ListRequest::default().filter("smith", ["name", "email"]);
    let page = ListingPlan::default().run(&request, query).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].get("name"), Some(&json!("Ben Smithers")));
}

// -------------------------------------------------------------------------
// Sort stage
// -------------------------------------------------------------------------

#[tokio::test]
async fn sort_ascending_and_descending() {
    for (directive, first_id) in [("id|asc", 1), ("id|DESC", 4)] {
        let page = ListingPlan::default()
            .run(&ListRequest::default().sort(directive), customer_table(4))
            .await
            .unwrap();
        assert_eq!(page.records[0].get("id"), Some(&json!(first_id)), "{directive}");
    }
}

#[tokio::test]
async fn malformed_sort_fails_the_request() {
    for directive in ["id", "id|asc|desc", "id|upward"] {
        let err = ListingPlan::default()
            .run(&ListRequest::default().sort(directive), customer_table(4))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ListError::MalformedSort(ref s) if s == directive),
            "{directive}: {err:?}"
        );
    }
}

#[test]
fn direction_parse_is_case_insensitive() {
    assert_eq!(SortDirection::parse("DeSc"), Some(SortDirection::Desc));
}

// -------------------------------------------------------------------------
// Filter stage
// -------------------------------------------------------------------------

#[tokio::test]
async fn filter_without_searchable_fields_matches_all() {
    let request = ListRequest::default().filter("smith", Vec::<String>::new());
    let page = ListingPlan::default()
        .run(&request, smith_table())
        .await
        .unwrap();

    assert_eq!(page.total, 20);
}

#[tokio::test]
async fn searchable_without_filter_matches_all() {
    let params = QueryParams::from_pairs([("searchable", "name,email")]);
    let page = ListingPlan::default()
        .run(&ListRequest::from_accessor(&params), smith_table())
        .await
        .unwrap();

    assert_eq!(page.total, 20);
}

#[tokio::test]
async fn filter_matches_only_listed_fields() {
    let request = ListRequest::default().filter("SMITH", ["email"]);
    let page = ListingPlan::default()
        .run(&request, smith_table())
        .await
        .unwrap();

    assert_eq!(page.total, 4);
    assert::all_contain(&page, &["email"], "smith");
}

// -------------------------------------------------------------------------
// Pagination stage
// -------------------------------------------------------------------------

#[tokio::test]
async fn unusable_per_page_falls_back_to_default() {
    for raw in [None, Some("0"), Some("-1"), Some("many")] {
        let mut request = ListRequest::default();
        request.per_page = raw.map(str::to_string);

        let page = ListingPlan::default()
            .run(&request, customer_table(40))
            .await
            .unwrap();
        assert_eq!(page.per_page, 15, "{raw:?}");
        assert_eq!(page.records.len(), 15, "{raw:?}");
        assert_eq!(page.total, 40);
    }
}

#[tokio::test]
async fn explicit_per_page_is_used() {
    let page = ListingPlan::default()
        .run(&ListRequest::default().per_page("7"), customer_table(40))
        .await
        .unwrap();

    assert_eq!(page.per_page, 7);
    assert_eq!(page.records.len(), 7);
}

#[tokio::test]
async fn per_page_is_capped_by_plan() {
    let plan = ListingBuilder::new().max_per_page(10).build();
    let page = plan
        .run(&ListRequest::default().per_page("500"), customer_table(40))
        .await
        .unwrap();

    assert_eq!(page.per_page, 10);
    assert_eq!(page.records.len(), 10);
}

// -------------------------------------------------------------------------
// Shaping stage
// -------------------------------------------------------------------------

#[tokio::test]
async fn shaping_edits_and_adds_columns_on_every_record() {
    let plan = ListingBuilder::new()
        .edit_column(
            "name",
            RuleValue::computed(|r| {
                json!(r.get("name").and_then(Value::as_str).unwrap_or_default().to_uppercase())
            }),
        )
        .add_column("nickname", RuleValue::computed(|r| r.get("id").cloned().unwrap_or_default()))
        .add_column("source", "crm")
        .build();

    let page = plan
        .run(&ListRequest::default().sort("id|asc"), customer_table(3))
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    for (i, record) in page.records.iter().enumerate() {
        let id = i as i64 + 1;
        assert_eq!(record.get("name"), Some(&json!(format!("CUSTOMER {id}"))));
        assert_eq!(record.get("nickname"), Some(&json!(id)));
        assert_eq!(record.get("source"), Some(&json!("crm")));
    }
}

#[tokio::test]
async fn derived_field_edit_aborts_the_page() {
    let rows = vec![
        test_customer(1, "Ada").into_record(),
        test_customer(2, "Bob")
            .with_derived("total_price", json!(20))
            .into_record(),
    ];
    let plan = ListingBuilder::new().edit_column("total_price", 10).build();

    let err = plan
        .run(&ListRequest::default(), MemoryQueryable::new(rows))
        .await
        .unwrap_err();

    assert!(matches!(err, ListError::DerivedFieldEdit(ref f) if f == "total_price"));
}

#[tokio::test]
async fn add_over_existing_value_aborts_the_page() {
    let rows = vec![
        test_customer(1, "Ada").into_record(),
        test_customer(2, "Bob").with_nickname("bobby").into_record(),
    ];
    let plan = ListingBuilder::new().add_column("nickname", "x").build();

    let err = plan
        .run(&ListRequest::default(), MemoryQueryable::new(rows))
        .await
        .unwrap_err();

    assert!(matches!(err, ListError::ColumnAlreadyExists(ref f) if f == "nickname"));
}

#[tokio::test]
async fn add_over_loaded_relation_aborts_the_page() {
    let rows = vec![test_customer(1, "Ada").with_author("Byron").into_record()];
    let plan = ListingBuilder::new().add_column("author", "x").build();

    let err = plan
        .run(&ListRequest::default(), MemoryQueryable::new(rows))
        .await
        .unwrap_err();

    assert!(matches!(err, ListError::ColumnAlreadyExists(ref f) if f == "author"));
}

#[tokio::test]
async fn edit_replaces_relation_with_scalar() {
    let rows = vec![test_customer(1, "Ada").with_author("Byron").into_record()];
    let plan = ListingBuilder::new().edit_column("author", "unknown").build();

    let page = plan
        .run(&ListRequest::default(), MemoryQueryable::new(rows))
        .await
        .unwrap();
    let record = &page.records[0];

    assert_eq!(record.get("author"), Some(&json!("unknown")));
    assert_eq!(record.relation("author"), Some(&Relation::Disassociated));
    assert_eq!(record.to_json()["author"], json!("unknown"));
}

#[tokio::test]
async fn add_fills_null_column() {
    let rows = vec![Record::new().with_field("name", Value::Null)];
    let plan = ListingBuilder::new().add_column("name", "x").build();

    let page = plan
        .run(&ListRequest::default(), MemoryQueryable::new(rows))
        .await
        .unwrap();

    assert_eq!(page.records[0].get("name"), Some(&json!("x")));
}

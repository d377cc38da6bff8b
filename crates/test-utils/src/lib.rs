//! Tabula test utilities.
//!
//! Helpers for integration testing: record fixtures, in-memory tables,
//! and assertion utilities for listing pages.

use serde_json::Value as JsonValue;
use tabula_kernel::listing::{MemoryQueryable, Record, Relation};

/// Create a test customer with default values.
pub fn test_customer(id: i64, name: &str) -> TestCustomer {
    TestCustomer {
        id,
        name: name.to_string(),
        email: format!("customer{id}@example.com"),
        age: 30,
        nickname: None,
        author: None,
        derived: Vec::new(),
    }
}

/// A test customer builder for creating record fixtures.
#[derive(Debug, Clone)]
pub struct TestCustomer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub nickname: Option<String>,
    pub author: Option<Record>,
    pub derived: Vec<(String, JsonValue)>,
}

impl TestCustomer {
    /// Set the email address.
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Set the age.
    pub fn with_age(mut self, age: i64) -> Self {
        self.age = age;
        self
    }

    /// Set a nickname (null when unset).
    pub fn with_nickname(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }

    /// Load an `author` relation.
    pub fn with_author(mut self, name: &str) -> Self {
        self.author = Some(
            Record::new()
                .with_field("id", self.id * 100)
                .with_field("name", name),
        );
        self
    }

    /// Add a derived field with its computed value.
    pub fn with_derived(mut self, name: &str, value: JsonValue) -> Self {
        self.derived.push((name.to_string(), value));
        self
    }

    /// Build the record.
    pub fn into_record(self) -> Record {
        let mut record = Record::new()
            .with_field("id", self.id)
            .with_field("name", self.name)
            .with_field("email", self.email)
            .with_field("age", self.age)
            .with_field(
                "nickname",
                self.nickname.map(JsonValue::from).unwrap_or(JsonValue::Null),
            );

        if let Some(author) = self.author {
            record.set_relation("author", Relation::One(Box::new(author)));
        }
        for (name, value) in self.derived {
            record.set(name.clone(), value);
            record.mark_derived(name);
        }
        record
    }
}

/// Twenty customers: twelve match "smith" in their name or email (in mixed
/// case), eight do not. Ages are distinct, so age ordering is total.
pub fn smith_customers() -> Vec<Record> {
    let matching = [
        ("John Smith", None),
        ("Anna SMITH", None),
        ("Ben Smithers", None),
        ("Cara Jones", Some("cara.smith@example.com")),
        ("Dev Patel", Some("dsmith@example.com")),
        ("Eve Goldsmith", None),
        ("Finn Blacksmith", None),
        ("Gail Smithson", None),
        ("Hugo Brown", Some("hugo@SMITH.co")),
        ("Iris Smith-Lee", None),
        ("Jack Wong", Some("jack_smith@example.org")),
        ("Kim Smithfield", None),
    ];
    let others = [
        "Liam Nguyen",
        "Mia Garcia",
        "Noah Kim",
        "Olga Petrova",
        "Paul Muller",
        "Quinn Adams",
        "Rosa Diaz",
        "Sam Lee",
    ];

    let mut rows = Vec::new();
    let mut id = 0;
    for (name, email) in matching {
        id += 1;
        let mut customer = test_customer(id, name).with_age(20 + id * 3);
        if let Some(email) = email {
            customer = customer.with_email(email);
        }
        rows.push(customer.into_record());
    }
    for name in others {
        id += 1;
        rows.push(test_customer(id, name).with_age(20 + id * 3).into_record());
    }
    rows
}

/// In-memory table over [`smith_customers`].
pub fn smith_table() -> MemoryQueryable {
    MemoryQueryable::new(smith_customers())
}

/// In-memory table of `n` customers with ids `1..=n`.
pub fn customer_table(n: i64) -> MemoryQueryable {
    MemoryQueryable::new(
        (1..=n)
            .map(|id| test_customer(id, &format!("Customer {id}")).into_record())
            .collect(),
    )
}

/// Assertion helpers for listing results.
pub mod assert {
    use serde_json::Value;
    use tabula_kernel::listing::Page;

    /// Assert that a field is ordered descending across the page.
    pub fn sorted_desc(page: &Page, field: &str) {
        let values: Vec<i64> = page
            .records
            .iter()
            .map(|r| r.get(field).and_then(Value::as_i64).unwrap_or(i64::MIN))
            .collect();
        assert!(
            values.windows(2).all(|w| w[0] >= w[1]),
            "Expected '{field}' descending, got: {values:?}"
        );
    }

    /// Assert that every record has `needle` (case-insensitive) in one of `fields`.
    pub fn all_contain(page: &Page, fields: &[&str], needle: &str) {
        let needle = needle.to_lowercase();
        for record in &page.records {
            let hit = fields.iter().any(|f| {
                record
                    .get(f)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.to_lowercase().contains(&needle))
            });
            assert!(
                hit,
                "Expected one of {fields:?} to contain '{needle}'\nActual: {}",
                record.to_json()
            );
        }
    }
}

//! Shared fixtures for the persistence integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};

use sieve_filter::{AcceptanceRules, ComplexType, ParseOptions, bind, parse_filter};
use sieve_persistence::backends::relational::{RelationalTranslator, SqlDialect, SqlFragment};
use sieve_persistence::backends::{MemoryCollection, MongoTranslator};
use sieve_persistence::core::{FilterTranslator, TranslationContext, translate_filter};
use sieve_persistence::error::QueryError;

/// Schema of the `customers` fixture, loaded from JSON.
pub fn customer_schema() -> ComplexType {
    serde_json::from_value(json!({
        "name": "Customer",
        "fields": [
            { "name": "id", "type": "integer" },
            { "name": "name", "type": "string" },
            { "name": "age", "type": "integer" },
            { "name": "status", "type": "string" },
            { "name": "balance", "type": "number" },
            { "name": "joined", "type": "date" }
        ]
    }))
    .expect("customer schema fixture is valid")
}

/// Customer records. Null and missing values are deliberate.
pub fn customers() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Ada", "age": 36, "status": "active", "balance": 120.5, "joined": "2020-01-15"}),
        json!({"id": 2, "name": "Alan", "age": 17, "status": "active", "balance": 5.0, "joined": "2023-06-01"}),
        json!({"id": 3, "name": "bob", "age": 20, "status": "inactive", "balance": null, "joined": "2021-03-10"}),
        json!({"id": 4, "name": "Grace", "age": null, "status": "active", "balance": 75, "joined": "2019-11-30"}),
        json!({"id": 5, "name": "Linus", "age": 52, "balance": 300}),
        json!({"id": 6, "name": "Margaret", "age": 20, "status": "pending", "balance": 0, "joined": "2022-08-08"}),
        json!({"id": 7, "name": "100%_sure", "age": 40, "status": "inactive", "balance": 10, "joined": "2024-02-29"}),
    ]
}

/// Customers with line breaks, non-ASCII letters and paired nulls.
pub fn edge_customers() -> Vec<Value> {
    vec![
        json!({"id": 11, "name": "A\nB", "age": null, "status": "active", "balance": null}),
        json!({"id": 12, "name": "Élan", "age": 30, "status": "active", "balance": 30}),
        json!({"id": 13, "name": "ÉMILE", "age": 25, "status": "pending", "balance": 12.5}),
        json!({"id": 14, "name": "ada", "age": null, "balance": null}),
    ]
}

/// In-memory collection holding the given records.
pub fn memory_collection_with(records: Vec<Value>) -> MemoryCollection {
    records.into_iter().collect()
}

/// In-memory SQLite database with a `customers` table holding the given records.
pub fn sqlite_connection_with(records: Vec<Value>) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().expect("open in-memory sqlite");
    conn.execute_batch(
        "CREATE TABLE customers (
            id INTEGER PRIMARY KEY,
            name TEXT,
            age INTEGER,
            status TEXT,
            balance REAL,
            joined TEXT
        );",
    )
    .expect("create customers table");

    for customer in records {
        conn.execute(
            "INSERT INTO customers (id, name, age, status, balance, joined) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                customer["id"].as_i64(),
                customer["name"].as_str(),
                customer["age"].as_i64(),
                customer["status"].as_str(),
                customer["balance"].as_f64(),
                customer["joined"].as_str(),
            ],
        )
        .expect("insert customer");
    }
    conn
}

/// Translates a filter for SQLite.
pub fn sqlite_fragment(filter: &str) -> SqlFragment {
    let schema = customer_schema();
    let rules = AcceptanceRules::unrestricted();
    let ast = parse_filter(filter).expect("filter parses");
    let bound = bind(&ast, &schema, &rules).expect("filter binds");
    RelationalTranslator::new(SqlDialect::Sqlite)
        .translate_to_sql(&bound, &TranslationContext::new(), 0)
        .expect("filter translates for sqlite")
}

/// Ids selected by the filter through SQLite.
pub fn sqlite_ids(conn: &rusqlite::Connection, filter: &str) -> Vec<i64> {
    let fragment = sqlite_fragment(filter);
    let sql = format!("SELECT id FROM customers WHERE {} ORDER BY id", fragment.sql);
    let mut stmt = conn.prepare(&sql).expect("prepare filter query");
    stmt.query_map(rusqlite::params_from_iter(fragment.params.iter()), |row| {
        row.get::<_, i64>(0)
    })
    .expect("run filter query")
    .collect::<Result<Vec<_>, _>>()
    .expect("read ids")
}

/// Ids selected by the filter through the MongoDB document and the in-memory matcher.
pub fn memory_ids(collection: &MemoryCollection, filter: &str) -> Vec<i64> {
    let document = translate(&MongoTranslator::new(), filter).expect("filter translates for mongodb");
    let mut ids: Vec<i64> = collection
        .find(&document)
        .expect("document compiles")
        .into_iter()
        .filter_map(|doc| doc["id"].as_i64())
        .collect();
    ids.sort_unstable();
    ids
}

/// Parses, binds and translates against the customer schema with no rules.
pub fn translate<T: FilterTranslator>(translator: &T, filter: &str) -> Result<T::Output, QueryError> {
    translate_filter(
        translator,
        filter,
        &ParseOptions::default(),
        &customer_schema(),
        &AcceptanceRules::unrestricted(),
        &TranslationContext::new(),
    )
}

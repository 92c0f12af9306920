//! Shared fixtures for the filter integration tests.

#![allow(dead_code)]

use serde_json::json;

use sieve_filter::{AcceptanceRules, ComplexType};

/// The customer schema used across the integration tests, loaded from JSON
/// the way endpoints load theirs.
pub fn customer_schema() -> ComplexType {
    serde_json::from_value(json!({
        "name": "Customer",
        "fields": [
            { "name": "name", "type": "string" },
            { "name": "age", "type": "integer" },
            { "name": "balance", "type": "decimal" },
            { "name": "verified", "type": "boolean" },
            { "name": "joined", "type": "date" },
            { "name": "lastSeen", "type": "datetime" },
            { "name": "status", "type": { "enum": ["active", "inactive", "banned"] } },
            { "name": "tags", "type": "string", "is_array": true },
            { "name": "address", "type": { "complex": {
                "name": "Address",
                "fields": [
                    { "name": "city", "type": "string" },
                    { "name": "zip", "type": "string" }
                ]
            } } },
            { "name": "attributes", "type": { "complex": {
                "name": "Attributes",
                "additional_fields": true
            } } }
        ]
    }))
    .expect("customer schema fixture is valid")
}

/// Rules for a typical list endpoint.
pub fn customer_rules() -> AcceptanceRules {
    serde_json::from_value(json!([
        { "field": "name", "operators": ["=", "!=", "like", "ilike"] },
        { "field": "age", "operators": ["=", "!="] },
        { "field": "balance" },
        { "field": "verified", "operators": ["="] },
        { "field": "joined" },
        { "field": "lastSeen" },
        { "field": "status", "operators": ["=", "!=", "in", "!in"] },
        { "field": "tags" },
        { "field": "address.city" },
        { "field": "attributes.tier" }
    ]))
    .expect("customer rules fixture is valid")
}

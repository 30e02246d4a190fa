//! Store schema.
//!
//! `object_types` emulates an enum of the four billing levels;
//! `billing_aggregation` holds one cumulative cost per level and id.

use billing_core::ObjectType;

/// Object type table, unique by name so seeding is repeatable.
pub const CREATE_OBJECT_TYPES: &str = r#"
CREATE TABLE IF NOT EXISTS object_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    object_type TEXT NOT NULL UNIQUE
)
"#;

/// Running totals, one row per (object_type, object_id).
pub const CREATE_BILLING_AGGREGATION: &str = r#"
CREATE TABLE IF NOT EXISTS billing_aggregation (
    object_type TEXT NOT NULL REFERENCES object_types(object_type),
    object_id TEXT NOT NULL,
    cost REAL NOT NULL DEFAULT 0,
    UNIQUE (object_type, object_id)
)
"#;

pub const SEED_OBJECT_TYPE: &str = "INSERT OR IGNORE INTO object_types (object_type) VALUES (?1)";

/// Adds to an existing total or inserts a new one.
pub const UPSERT_AGGREGATE: &str = r#"
INSERT INTO billing_aggregation (object_type, object_id, cost)
VALUES (?1, ?2, ?3)
ON CONFLICT (object_type, object_id) DO UPDATE SET cost = cost + excluded.cost
"#;

/// Seed rows for `object_types`, in id order.
pub fn object_type_seeds() -> impl Iterator<Item = &'static str> {
    ObjectType::ALL.into_iter().map(|ty| ty.as_str())
}

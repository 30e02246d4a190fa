//! SQLite store for billing aggregates.

pub mod client;
pub mod config;
pub mod health;
pub mod insert;
pub mod query;
pub mod schema;

pub use client::*;
pub use config::*;
pub use health::{check_connection, init_schema};
pub use insert::{upsert_aggregate, upsert_totals};
pub use query::*;

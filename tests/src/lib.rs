//! Shared helpers for the billing pipeline integration tests.

pub mod fixtures;
pub mod mocks;
pub mod setup;

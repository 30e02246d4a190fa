//! Core types, tag decoding, and cost aggregation for the billing aggregator.

pub mod aggregate;
pub mod error;
pub mod limits;
pub mod object;
pub mod sink;
pub mod tag;
pub mod totals;

pub use aggregate::*;
pub use error::{ArchiveErrorCode, DbErrorCode, Error, Result};
pub use object::*;
pub use sink::*;
pub use tag::*;
pub use totals::*;

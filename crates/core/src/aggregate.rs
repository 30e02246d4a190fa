//! Per-row cost aggregation.

use std::fmt;

use csv::ByteRecord;

use crate::error::{Error, Result};
use crate::tag::{IdentifierTag, TagIndex};
use crate::totals::AggregationTotals;

/// Why a row was left out of the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The identifier tag did not split into five segments.
    MalformedTag { segments: usize },
    /// The row is too short to hold the meta-tag or cost column.
    MissingField { index: usize },
    /// The meta-tag or cost field is not valid UTF-8.
    InvalidEncoding { index: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedTag { segments } => {
                write!(f, "identifier tag has {segments} segments")
            }
            Self::MissingField { index } => write!(f, "row has no field {index}"),
            Self::InvalidEncoding { index } => write!(f, "field {index} is not valid UTF-8"),
        }
    }
}

/// What happened to one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowOutcome {
    /// Cost was added to `buckets` levels (0 to 4).
    Aggregated { buckets: usize, cost: f64 },
    Skipped(SkipReason),
}

/// Decodes one row and adds its cost to `totals`.
///
/// Only the meta-tag and cost fields are decoded; other columns may hold any
/// bytes. Rows with a malformed or undecodable tag or cost, or too few fields,
/// come back as
/// [`RowOutcome::Skipped`] and leave `totals` untouched. An unparseable cost
/// is returned as [`Error::InvalidCost`], also without touching `totals`.
pub fn aggregate_row(
    totals: &mut AggregationTotals,
    row: &ByteRecord,
    index: TagIndex,
) -> Result<RowOutcome> {
    let raw_tag = match field(row, index.meta_tag) {
        Ok(raw) => raw,
        Err(reason) => return Ok(RowOutcome::Skipped(reason)),
    };

    let tag = match IdentifierTag::parse(raw_tag) {
        Ok(tag) => tag,
        Err(segments) => return Ok(RowOutcome::Skipped(SkipReason::MalformedTag { segments })),
    };

    let raw_cost = match field(row, index.cost) {
        Ok(raw) => raw,
        Err(reason) => return Ok(RowOutcome::Skipped(reason)),
    };
    let cost = parse_cost(raw_cost, index.cost)?;

    let mut buckets = 0;
    for (object_type, id) in tag.ids() {
        totals.add(object_type, id, cost);
        buckets += 1;
    }

    Ok(RowOutcome::Aggregated { buckets, cost })
}

fn field(row: &ByteRecord, index: usize) -> std::result::Result<&str, SkipReason> {
    let raw = row.get(index).ok_or(SkipReason::MissingField { index })?;
    std::str::from_utf8(raw).map_err(|_| SkipReason::InvalidEncoding { index })
}

fn parse_cost(raw: &str, column: usize) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(cost) if cost.is_finite() => Ok(cost),
        _ => Err(Error::invalid_cost(raw, column)),
    }
}

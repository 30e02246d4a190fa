//! Header and identifier tag decoding.

use crate::error::{Error, Result};
use crate::limits::{IDENTIFIER_SEGMENTS, IDENTIFIER_SEPARATOR};
use crate::object::ObjectType;

/// Column holding the colon-delimited identifier tag.
pub const META_TAG_COLUMN: &str = "user:scalr-meta";

/// Column holding the row's cost.
pub const COST_COLUMN: &str = "Cost";

/// Positions of the meta-tag and cost columns in a CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagIndex {
    pub meta_tag: usize,
    pub cost: usize,
}

impl TagIndex {
    pub const fn new(meta_tag: usize, cost: usize) -> Self {
        Self { meta_tag, cost }
    }

    /// Lenient lookup.
    ///
    /// Falls back to `(0, 0)` when the meta-tag column is absent, and to a
    /// cost column of 0 when `Cost` is absent. The fallback aliases real
    /// columns, so callers that aggregate should use [`TagIndex::resolve`].
    pub fn from_headers<'h, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'h str>,
    {
        match locate(headers) {
            (Some(meta_tag), cost) => Self::new(meta_tag, cost.unwrap_or(0)),
            (None, _) => Self::default(),
        }
    }

    /// Strict lookup. Fails with [`Error::MissingColumn`] naming the absent column.
    pub fn resolve<'h, I>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'h str>,
    {
        match locate(headers) {
            (Some(meta_tag), Some(cost)) => Ok(Self::new(meta_tag, cost)),
            (None, _) => Err(Error::missing_column(META_TAG_COLUMN)),
            (_, None) => Err(Error::missing_column(COST_COLUMN)),
        }
    }
}

/// First occurrence of each column, by exact name.
fn locate<'h, I>(headers: I) -> (Option<usize>, Option<usize>)
where
    I: IntoIterator<Item = &'h str>,
{
    let mut meta_tag = None;
    let mut cost = None;

    for (i, name) in headers.into_iter().enumerate() {
        if name == META_TAG_COLUMN && meta_tag.is_none() {
            meta_tag = Some(i);
        } else if name == COST_COLUMN && cost.is_none() {
            cost = Some(i);
        }
    }

    (meta_tag, cost)
}

/// A decoded `version:env:farm:farm_role:server` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierTag<'a> {
    segments: [&'a str; IDENTIFIER_SEGMENTS],
}

impl<'a> IdentifierTag<'a> {
    /// Splits a raw tag. On a wrong segment count, returns the count found.
    pub fn parse(raw: &'a str) -> std::result::Result<Self, usize> {
        let found = raw.split(IDENTIFIER_SEPARATOR).count();
        if found != IDENTIFIER_SEGMENTS {
            return Err(found);
        }

        let mut segments = [""; IDENTIFIER_SEGMENTS];
        for (slot, part) in segments.iter_mut().zip(raw.split(IDENTIFIER_SEPARATOR)) {
            *slot = part;
        }
        Ok(Self { segments })
    }

    /// Identifier for one level. Empty when the tag leaves that level blank.
    pub fn id(&self, object_type: ObjectType) -> &'a str {
        self.segments[object_type.index() + 1]
    }

    /// Non-empty identifiers, outermost level first.
    pub fn ids(&self) -> impl Iterator<Item = (ObjectType, &'a str)> + '_ {
        ObjectType::ALL
            .into_iter()
            .map(move |ty| (ty, self.id(ty)))
            .filter(|(_, id)| !id.is_empty())
    }
}

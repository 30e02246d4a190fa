//! Billing object levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One level of the billing hierarchy.
///
/// The string form is the `object_type` key in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Env,
    Farm,
    FarmRole,
    Server,
}

impl ObjectType {
    /// All levels, outermost first. Matches identifier tag segment order.
    pub const ALL: [ObjectType; 4] = [Self::Env, Self::Farm, Self::FarmRole, Self::Server];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Farm => "farm",
            Self::FarmRole => "farm_role",
            Self::Server => "server",
        }
    }

    /// Position in [`ObjectType::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::Env => 0,
            Self::Farm => 1,
            Self::FarmRole => 2,
            Self::Server => 3,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::internal(format!("unknown object type: {s}")))
    }
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical upstream provider identifiers used in snapshots, chains and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Alphavantage,
    Polygon,
    Yahoo,
    Fred,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [Self::Alphavantage, Self::Polygon, Self::Yahoo, Self::Fred];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alphavantage => "alphavantage",
            Self::Polygon => "polygon",
            Self::Yahoo => "yahoo",
            Self::Fred => "fred",
        }
    }

    /// Display name used in outward `source` fields.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Alphavantage => "Alpha Vantage",
            Self::Polygon => "Polygon",
            Self::Yahoo => "Yahoo Finance",
            Self::Fred => "FRED",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "alphavantage" | "alpha-vantage" => Ok(Self::Alphavantage),
            "polygon" => Ok(Self::Polygon),
            "yahoo" => Ok(Self::Yahoo),
            "fred" => Ok(Self::Fred),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

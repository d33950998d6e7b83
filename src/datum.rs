//! NOAA tidal datum codes and the reading tags of an observation record.
//!
//! See <https://tidesandcurrents.noaa.gov/datum_options.html>.

use std::fmt;
use std::str::FromStr;

use crate::error::TideError;

/// A tidal datum the service can report values against.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Datum {
    Mhhw,
    Mhw,
    Dtl,
    Mtl,
    #[default]
    Msl,
    Mlw,
    Mllw,
    Gt,
    Mn,
    Dhq,
    Dlq,
    Hwi,
    Lwi,
}

impl Datum {
    pub const ALL: [Datum; 13] = [
        Datum::Mhhw,
        Datum::Mhw,
        Datum::Dtl,
        Datum::Mtl,
        Datum::Msl,
        Datum::Mlw,
        Datum::Mllw,
        Datum::Gt,
        Datum::Mn,
        Datum::Dhq,
        Datum::Dlq,
        Datum::Hwi,
        Datum::Lwi,
    ];

    /// The wire code, which is also the element name in observation records.
    pub fn code(self) -> &'static str {
        match self {
            Datum::Mhhw => "MHHW",
            Datum::Mhw => "MHW",
            Datum::Dtl => "DTL",
            Datum::Mtl => "MTL",
            Datum::Msl => "MSL",
            Datum::Mlw => "MLW",
            Datum::Mllw => "MLLW",
            Datum::Gt => "GT",
            Datum::Mn => "MN",
            Datum::Dhq => "DHQ",
            Datum::Dlq => "DLQ",
            Datum::Hwi => "HWI",
            Datum::Lwi => "LWI",
        }
    }

    /// Exact, case-sensitive match against a response tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == tag)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parses user input. Tokens are upper-cased first, so `mllw` is accepted.
impl FromStr for Datum {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_uppercase();
        Datum::from_tag(&token).ok_or_else(|| {
            TideError::Config(format!(
                "unknown datum '{}' (expected one of: {})",
                s.trim(),
                Datum::ALL
                    .iter()
                    .map(|d| d.code())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }
}

/// A value-bearing tag inside an observation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reading {
    Datum(Datum),
    Highest,
    Lowest,
    Inferred,
}

impl Reading {
    pub fn tag(self) -> &'static str {
        match self {
            Reading::Datum(d) => d.code(),
            Reading::Highest => "highest",
            Reading::Lowest => "lowest",
            Reading::Inferred => "inferred",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "highest" => Some(Reading::Highest),
            "lowest" => Some(Reading::Lowest),
            "inferred" => Some(Reading::Inferred),
            other => Datum::from_tag(other).map(Reading::Datum),
        }
    }
}

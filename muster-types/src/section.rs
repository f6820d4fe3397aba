//! Age sections and the cache/remote partition keys derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Partition key for rows that belong to no single section (roles, invites,
/// organisation-wide audit logs).
pub const GLOBAL_SECTION: &str = "global";

/// The four age sections of the organisation. Every member, settings blob and
/// most audit logs belong to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Anchors,
    Juniors,
    Company,
    Seniors,
}

impl Section {
    /// All sections in ascending age order.
    pub const ALL: [Section; 4] = [
        Section::Anchors,
        Section::Juniors,
        Section::Company,
        Section::Seniors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Anchors => "anchors",
            Section::Juniors => "juniors",
            Section::Company => "company",
            Section::Seniors => "seniors",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown section: {0}")]
pub struct ParseSectionError(String);

impl FromStr for Section {
    type Err = ParseSectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anchors" => Ok(Section::Anchors),
            "juniors" => Ok(Section::Juniors),
            "company" => Ok(Section::Company),
            "seniors" => Ok(Section::Seniors),
            other => Err(ParseSectionError(other.to_string())),
        }
    }
}

/// Maps an optional section to the partition key used by the cache and the
/// remote row store. `None` means organisation-wide.
pub fn section_key(section: Option<Section>) -> &'static str {
    match section {
        Some(s) => s.as_str(),
        None => GLOBAL_SECTION,
    }
}

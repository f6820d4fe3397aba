//! Roster members and their per-parade mark history.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::section::Section;

/// Client-generated member identifier. Generated on the device that creates
/// the member so that offline creates replay idempotently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One parade night's record for one member. Dates are ISO `YYYY-MM-DD`
/// strings so that lexicographic order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub date: String,
    /// Attendance score. Negative means absent.
    pub score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behaviour: Option<i32>,
}

impl Mark {
    /// Sentinel score recorded for an absence.
    pub const ABSENT: i32 = -1;

    pub fn present(date: impl Into<String>, score: i32) -> Self {
        Self {
            date: date.into(),
            score,
            uniform: None,
            behaviour: None,
        }
    }

    pub fn absent(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            score: Self::ABSENT,
            uniform: None,
            behaviour: None,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.score < 0
    }
}

/// A roster member. The `marks` history is append-or-replace by date and is
/// never truncated by normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub section: Section,
    pub name: String,
    pub year: i32,
    pub squad: i32,
    #[serde(default)]
    pub is_leader: bool,
    #[serde(default)]
    pub marks: Vec<Mark>,
}

impl Member {
    pub fn new(section: Section, name: impl Into<String>, year: i32, squad: i32) -> Self {
        Self {
            id: MemberId::new(),
            section,
            name: name.into(),
            year,
            squad,
            is_leader: false,
            marks: Vec::new(),
        }
    }

    /// Inserts a mark, replacing any existing mark for the same date. At most
    /// one mark per date; history stays in chronological order.
    pub fn upsert_mark(&mut self, mark: Mark) {
        match self.marks.iter_mut().find(|m| m.date == mark.date) {
            Some(existing) => *existing = mark,
            None => {
                self.marks.push(mark);
                self.marks.sort_by(|a, b| a.date.cmp(&b.date));
            }
        }
    }

    pub fn mark_on(&self, date: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.date == date)
    }
}

/// Input for creating a new member. The id is assigned by the caller's device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub year: i32,
    pub squad: i32,
    #[serde(default)]
    pub is_leader: bool,
}

//! Team history model: one record per stint a member spends in a team.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Privilege tier held by a member within a team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Privilege {
    Leader,
    Board,
    Member,
}

impl Privilege {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::Leader => "LEADER",
            Privilege::Board => "BOARD",
            Privilege::Member => "MEMBER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LEADER" => Some(Privilege::Leader),
            "BOARD" => Some(Privilege::Board),
            "MEMBER" => Some(Privilege::Member),
            _ => None,
        }
    }

    /// Human readable form used in role labels ("Leader", "Member").
    pub fn label(&self) -> &'static str {
        match self {
            Privilege::Leader => "Leader",
            Privilege::Board => "Board",
            Privilege::Member => "Member",
        }
    }
}

/// Academic semester. Spring covers January to June, fall July to December.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Semester {
    Spring,
    Fall,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Spring => "SPRING",
            Semester::Fall => "FALL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SPRING" => Some(Semester::Spring),
            "FALL" => Some(Semester::Fall),
            _ => None,
        }
    }

    pub fn of_month(month: u32) -> Self {
        if month <= 6 {
            Semester::Spring
        } else {
            Semester::Fall
        }
    }
}

/// A (semester, year) point used for start and end fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemesterDate {
    pub semester: Semester,
    pub year: i32,
}

impl SemesterDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            semester: Semester::of_month(date.month()),
            year: date.year(),
        }
    }

    /// The semester containing today's UTC date.
    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }
}

/// A membership record linking a member to a team.
///
/// The record is open (current) while both end fields are absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamHistory {
    #[serde(rename = "teamHistoryID")]
    pub team_history_id: i64,
    #[serde(rename = "memberID")]
    pub member_id: i64,
    #[serde(rename = "teamID")]
    pub team_id: i64,
    #[serde(rename = "priviledges")]
    pub privileges: Privilege,
    #[serde(rename = "cPosition", skip_serializing_if = "Option::is_none")]
    pub c_position: Option<String>,
    pub start_sem: Semester,
    pub start_year: i32,
    #[serde(default)]
    pub end_sem: Option<Semester>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

impl TeamHistory {
    pub fn is_open(&self) -> bool {
        self.end_sem.is_none() && self.end_year.is_none()
    }

    pub fn is_open_in(&self, team_id: i64) -> bool {
        self.team_id == team_id && self.is_open()
    }
}

/// Request body for creating a team history record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamHistoryRequest {
    #[serde(rename = "memberID")]
    pub member_id: i64,
    #[serde(rename = "teamID")]
    pub team_id: i64,
    #[serde(rename = "priviledges")]
    pub privileges: Privilege,
    #[serde(rename = "cPosition", default)]
    pub c_position: Option<String>,
}

impl CreateTeamHistoryRequest {
    pub fn new(member_id: i64, team_id: i64, privileges: Privilege) -> Self {
        Self {
            member_id,
            team_id,
            privileges,
            c_position: None,
        }
    }
}

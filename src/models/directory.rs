//! Directory snapshot returned to clients for local derivation and change detection.

use serde::{Deserialize, Serialize};

use super::{Member, Team, TeamHistory};

/// The full directory: every member, team and team history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub members: Vec<Member>,
    pub teams: Vec<Team>,
    pub team_histories: Vec<TeamHistory>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

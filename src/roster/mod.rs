//! Team roster derivation and reconciliation.
//!
//! Everything in this module is a pure function of the member, team and team
//! history lists. State changes live in [`Reconciler`], which turns each roster
//! action into a sequence of awaited store writes.

#[cfg(test)]
mod memory;
mod profile;
mod reconciler;
mod store;

#[cfg(test)]
pub use memory::MemoryStore;
pub use profile::*;
pub use reconciler::*;
pub use store::*;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Member, Privilege, Team, TeamHistory};

/// Current roster of one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    pub team_id: i64,
    /// Distinct member IDs with an open record, in first appearance order
    pub member_ids: Vec<i64>,
    /// Members on the roster, leader included, in member list order
    pub members: Vec<Member>,
    pub leader: Option<Member>,
}

impl Roster {
    pub fn contains(&self, member_id: i64) -> bool {
        self.member_ids.contains(&member_id)
    }

    pub fn is_leader(&self, member_id: i64) -> bool {
        self.leader
            .as_ref()
            .is_some_and(|leader| leader.member_id == member_id)
    }

    /// Roster members other than the leader.
    pub fn others(&self) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| !self.is_leader(m.member_id))
            .cloned()
            .collect()
    }
}

/// Open records a member holds in one team. More than one means the directory is inconsistent.
pub fn open_records_for(
    histories: &[TeamHistory],
    member_id: i64,
    team_id: i64,
) -> Vec<&TeamHistory> {
    histories
        .iter()
        .filter(|h| h.member_id == member_id && h.is_open_in(team_id))
        .collect()
}

/// Whether the member holds an open record in any team.
pub fn has_open_record(histories: &[TeamHistory], member_id: i64) -> bool {
    histories
        .iter()
        .any(|h| h.member_id == member_id && h.is_open())
}

/// Derive the roster of `team_id`.
///
/// With several open LEADER records the first roster member holding one wins;
/// [`integrity_issues`] reports that state separately.
pub fn derive_roster(members: &[Member], histories: &[TeamHistory], team_id: i64) -> Roster {
    let mut member_ids: Vec<i64> = Vec::new();
    for history in histories.iter().filter(|h| h.is_open_in(team_id)) {
        if !member_ids.contains(&history.member_id) {
            member_ids.push(history.member_id);
        }
    }

    let members: Vec<Member> = members
        .iter()
        .filter(|m| member_ids.contains(&m.member_id))
        .cloned()
        .collect();

    let leader = members
        .iter()
        .find(|m| {
            open_records_for(histories, m.member_id, team_id)
                .iter()
                .any(|h| h.privileges == Privilege::Leader)
        })
        .cloned();

    Roster {
        team_id,
        member_ids,
        members,
        leader,
    }
}

/// Case-insensitive substring match on full name or organization mail.
pub fn matches_query(member: &Member, query: &str) -> bool {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    member.full_name().to_lowercase().contains(&needle)
        || member.orbit_mail.to_lowercase().contains(&needle)
}

/// Members that can be added to `team_id`: everyone without an open record there.
pub fn eligible_to_add(
    members: &[Member],
    histories: &[TeamHistory],
    team_id: i64,
    query: &str,
) -> Vec<Member> {
    members
        .iter()
        .filter(|m| open_records_for(histories, m.member_id, team_id).is_empty())
        .filter(|m| matches_query(m, query))
        .cloned()
        .collect()
}

/// A violation of the roster invariants found in the stored records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityIssue {
    /// A member holds several open records in the same team
    DuplicateOpenRecords {
        #[serde(rename = "memberID")]
        member_id: i64,
        #[serde(rename = "teamID")]
        team_id: i64,
        #[serde(rename = "teamHistoryIDs")]
        team_history_ids: Vec<i64>,
    },
    /// A team has more than one open LEADER record
    MultipleLeaders {
        #[serde(rename = "teamID")]
        team_id: i64,
        #[serde(rename = "memberIDs")]
        member_ids: Vec<i64>,
    },
    /// A team has open records but no leader
    MissingLeader {
        #[serde(rename = "teamID")]
        team_id: i64,
    },
}

impl IntegrityIssue {
    pub fn team_id(&self) -> i64 {
        match self {
            IntegrityIssue::DuplicateOpenRecords { team_id, .. }
            | IntegrityIssue::MultipleLeaders { team_id, .. }
            | IntegrityIssue::MissingLeader { team_id } => *team_id,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            IntegrityIssue::DuplicateOpenRecords {
                member_id,
                team_id,
                team_history_ids,
            } => format!(
                "member {} has {} open records in team {}",
                member_id,
                team_history_ids.len(),
                team_id
            ),
            IntegrityIssue::MultipleLeaders {
                team_id,
                member_ids,
            } => format!("team {} has {} leaders", team_id, member_ids.len()),
            IntegrityIssue::MissingLeader { team_id } => {
                format!("team {} has members but no leader", team_id)
            }
        }
    }
}

/// Check every team for duplicate open records, multiple leaders and missing leaders.
///
/// `exempt_teams` skips the leader checks for teams that are not led by a
/// single leader (the board).
pub fn integrity_issues(histories: &[TeamHistory], exempt_teams: &[i64]) -> Vec<IntegrityIssue> {
    let mut by_pair: BTreeMap<(i64, i64), Vec<i64>> = BTreeMap::new();
    let mut by_team: BTreeMap<i64, Vec<&TeamHistory>> = BTreeMap::new();
    for history in histories.iter().filter(|h| h.is_open()) {
        by_pair
            .entry((history.team_id, history.member_id))
            .or_default()
            .push(history.team_history_id);
        by_team.entry(history.team_id).or_default().push(history);
    }

    let mut issues = Vec::new();
    for ((team_id, member_id), ids) in by_pair {
        if ids.len() > 1 {
            issues.push(IntegrityIssue::DuplicateOpenRecords {
                member_id,
                team_id,
                team_history_ids: ids,
            });
        }
    }

    for (team_id, open) in by_team {
        if exempt_teams.contains(&team_id) {
            continue;
        }
        let mut leaders: Vec<i64> = open
            .iter()
            .filter(|h| h.privileges == Privilege::Leader)
            .map(|h| h.member_id)
            .collect();
        leaders.sort_unstable();
        leaders.dedup();
        match leaders.len() {
            0 => issues.push(IntegrityIssue::MissingLeader { team_id }),
            1 => {}
            _ => issues.push(IntegrityIssue::MultipleLeaders {
                team_id,
                member_ids: leaders,
            }),
        }
    }

    issues
}

/// Name of a team, or "N/A" when unknown.
pub fn team_name(teams: &[Team], team_id: i64) -> String {
    teams
        .iter()
        .find(|t| t.team_id == team_id)
        .map(|t| t.team_name.clone())
        .unwrap_or_else(|| "N/A".to_string())
}

/// The member's first open record, if any.
pub fn current_record(histories: &[TeamHistory], member_id: i64) -> Option<&TeamHistory> {
    histories
        .iter()
        .find(|h| h.member_id == member_id && h.is_open())
}

pub fn current_team_name(teams: &[Team], histories: &[TeamHistory], member_id: i64) -> String {
    current_record(histories, member_id)
        .map(|h| team_name(teams, h.team_id))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Role shown next to a member: the board position for board records,
/// otherwise the privilege ("Leader", "Member").
pub fn role_label(histories: &[TeamHistory], member_id: i64, board_team_id: i64) -> String {
    match current_record(histories, member_id) {
        None => "Unknown Team".to_string(),
        Some(history) => record_role(history, board_team_id),
    }
}

pub(crate) fn record_role(history: &TeamHistory, board_team_id: i64) -> String {
    let board = history.team_id == board_team_id || history.privileges == Privilege::Board;
    match (&history.c_position, board) {
        (Some(position), true) if !position.trim().is_empty() => position.clone(),
        _ => history.privileges.label().to_string(),
    }
}

/// Resolve the signed-in member from the session mail.
pub fn find_session_member<'a>(members: &'a [Member], email: &str) -> Option<&'a Member> {
    members
        .iter()
        .find(|m| m.orbit_mail.eq_ignore_ascii_case(email.trim()))
}

/// The team a member currently belongs to (their first open record).
pub fn session_team_id(histories: &[TeamHistory], member_id: i64) -> Option<i64> {
    current_record(histories, member_id).map(|h| h.team_id)
}

/// Leaders may edit their own team; board members may edit every team.
pub fn can_edit_team(
    histories: &[TeamHistory],
    actor_id: i64,
    team_id: i64,
    board_team_id: i64,
) -> bool {
    histories
        .iter()
        .filter(|h| h.member_id == actor_id && h.is_open())
        .any(|h| {
            (h.team_id == team_id && h.privileges == Privilege::Leader)
                || h.team_id == board_team_id
                || h.privileges == Privilege::Board
        })
}

/// A member as listed in the directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub member: Member,
    pub current_team: String,
    pub role: String,
}

/// Directory listing split into active and inactive members.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub active: Vec<DirectoryEntry>,
    pub inactive: Vec<DirectoryEntry>,
}

/// Active members with any team history, by first name, followed by inactive members.
pub fn directory_listing(
    members: &[Member],
    teams: &[Team],
    histories: &[TeamHistory],
    board_team_id: i64,
) -> DirectoryListing {
    let entry = |member: &Member| DirectoryEntry {
        member: member.clone(),
        current_team: current_team_name(teams, histories, member.member_id),
        role: role_label(histories, member.member_id, board_team_id),
    };

    let mut active: Vec<&Member> = members
        .iter()
        .filter(|m| m.active_status && histories.iter().any(|h| h.member_id == m.member_id))
        .collect();
    active.sort_by(|a, b| a.first_name.cmp(&b.first_name));

    DirectoryListing {
        active: active.into_iter().map(entry).collect(),
        inactive: members
            .iter()
            .filter(|m| !m.active_status)
            .map(entry)
            .collect(),
    }
}

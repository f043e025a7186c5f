//! Profile rendering.

use super::record_role;
use crate::models::{
    field_value, FieldVisibility, Member, ProfileField, ProfileTeamRecord, ProfileView, Team,
    TeamHistory, PROFILE_EDIT_VIEW, PROFILE_VIEW,
};

fn rendered(rule: &FieldVisibility, member: &Member) -> ProfileField {
    ProfileField {
        field: rule.field.to_string(),
        label: rule.label.to_string(),
        value: field_value(member, rule.field),
    }
}

fn period(history: &TeamHistory) -> String {
    let start = format!("{} {}", history.start_sem.as_str(), history.start_year);
    match (history.end_sem, history.end_year) {
        (Some(sem), Some(year)) => format!("{} - {} {}", start, sem.as_str(), year),
        _ => format!("{} - present", start),
    }
}

/// Team records of a member, newest start year first.
pub fn profile_team_records(
    member_id: i64,
    teams: &[Team],
    histories: &[TeamHistory],
    board_team_id: i64,
) -> Vec<ProfileTeamRecord> {
    let mut records: Vec<&TeamHistory> = histories
        .iter()
        .filter(|h| h.member_id == member_id)
        .collect();
    records.sort_by(|a, b| b.start_year.cmp(&a.start_year));

    records
        .into_iter()
        .map(|history| {
            let team_name = super::team_name(teams, history.team_id);
            let role = record_role(history, board_team_id);
            let period = period(history);
            ProfileTeamRecord {
                team_history_id: history.team_history_id,
                team_id: history.team_id,
                label: format!("{}, {} ({})", team_name, role, period),
                team_name,
                role,
                period,
                current: history.is_open(),
            }
        })
        .collect()
}

/// Render the read-only profile of `member`.
///
/// Visible fields with a value land in `known`, the rest in `unknown`. Redacted
/// fields are left out entirely for other viewers unless the member opted in to
/// showing their phone number.
pub fn render_profile(
    member: &Member,
    is_self: bool,
    teams: &[Team],
    histories: &[TeamHistory],
    board_team_id: i64,
) -> ProfileView {
    let shows_redacted = is_self || member.show_phone_nr_on_website.unwrap_or(false);

    let (known, unknown): (Vec<ProfileField>, Vec<ProfileField>) = PROFILE_VIEW
        .iter()
        .filter(|rule| rule.visible && (!rule.redacted || shows_redacted))
        .map(|rule| rendered(rule, member))
        .partition(|field| field.value.is_some());

    let editable = if is_self {
        PROFILE_EDIT_VIEW
            .iter()
            .filter(|rule| rule.visible)
            .map(|rule| rendered(rule, member))
            .collect()
    } else {
        Vec::new()
    };

    ProfileView {
        member_id: member.member_id,
        full_name: member.full_name(),
        is_self,
        known,
        unknown,
        editable,
        teams: profile_team_records(member.member_id, teams, histories, board_team_id),
        version: member.version,
    }
}

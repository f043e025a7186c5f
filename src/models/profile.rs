//! Profile views over a member, driven by explicit field-visibility tables.

use serde::{Deserialize, Serialize};

use super::{Member, UpdateMemberRequest};

/// Visibility rule for a single member field within one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldVisibility {
    pub field: &'static str,
    pub visible: bool,
    pub label: &'static str,
    /// Shown only to the member themselves unless the member opted in
    pub redacted: bool,
}

const fn field(
    field: &'static str,
    visible: bool,
    label: &'static str,
    redacted: bool,
) -> FieldVisibility {
    FieldVisibility {
        field,
        visible,
        label,
        redacted,
    }
}

/// Read-only profile view, sorted by field name.
pub const PROFILE_VIEW: &[FieldVisibility] = &[
    field("activeStatus", false, "Active", false),
    field("additionalComments", false, "Additional comments", false),
    field("birthday", true, "Birthday", false),
    field("fieldOfStudy", true, "Field of study", false),
    field("firstName", true, "First name", false),
    field("lastName", true, "Last name", false),
    field("memberID", false, "Member ID", false),
    field("nationalities", true, "Nationalities", false),
    field("ntnuMail", true, "NTNU mail", false),
    field("orbitMail", false, "Orbit mail", false),
    field("personalMail", true, "Personal mail", false),
    field("phoneNumber", true, "Phone number", true),
    field(
        "showPhoneNrOnWebsite",
        true,
        "Show phone number on website",
        false,
    ),
    field("slackID", false, "Slack ID", false),
    field("yearOfStudy", true, "Year of study", false),
];

/// Editable fields of the member's own profile.
pub const PROFILE_EDIT_VIEW: &[FieldVisibility] = &[
    field("firstName", true, "First name", false),
    field("lastName", true, "Last name", false),
    field("ntnuMail", true, "NTNU mail", false),
    field("personalMail", true, "Personal mail", false),
    field("phoneNumber", true, "Phone number", false),
    field(
        "showPhoneNrOnWebsite",
        true,
        "Show phone number on website",
        false,
    ),
    field("birthday", true, "Birthday", false),
    field("nationalities", true, "Nationalities", false),
    field("fieldOfStudy", true, "Field of study", false),
    field("yearOfStudy", true, "Year of study", false),
    field("additionalComments", true, "Additional comments", false),
    field("memberID", false, "Member ID", false),
    field("orbitMail", false, "Orbit mail", false),
    field("slackID", false, "Slack ID", false),
    field("activeStatus", false, "Active", false),
];

/// Render a member field as display text, or `None` when the value is unknown.
pub fn field_value(member: &Member, field: &str) -> Option<String> {
    match field {
        "memberID" => Some(member.member_id.to_string()),
        "firstName" => non_empty(&member.first_name),
        "lastName" => non_empty(&member.last_name),
        "orbitMail" => non_empty(&member.orbit_mail),
        "ntnuMail" => member.ntnu_mail.as_deref().and_then(non_empty),
        "personalMail" => member.personal_mail.as_deref().and_then(non_empty),
        "phoneNumber" => member.phone_number.as_deref().and_then(non_empty),
        // An unset flag means the member never opted in
        "showPhoneNrOnWebsite" => {
            Some(member.show_phone_nr_on_website.unwrap_or(false).to_string())
        }
        "birthday" => member.birthday.as_deref().and_then(non_empty),
        "nationalities" => member.nationalities.as_deref().and_then(non_empty),
        "fieldOfStudy" => non_empty(&member.field_of_study),
        "yearOfStudy" => member.year_of_study.map(|y| y.to_string()),
        "additionalComments" => member.additional_comments.as_deref().and_then(non_empty),
        "slackID" => member.slack_id.as_deref().and_then(non_empty),
        "activeStatus" => Some(member.active_status.to_string()),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// A single rendered profile field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileField {
    pub field: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// One team membership on a profile, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTeamRecord {
    #[serde(rename = "teamHistoryID")]
    pub team_history_id: i64,
    #[serde(rename = "teamID")]
    pub team_id: i64,
    pub team_name: String,
    pub role: String,
    pub period: String,
    pub current: bool,
    pub label: String,
}

/// Rendered read-only profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(rename = "memberID")]
    pub member_id: i64,
    pub full_name: String,
    pub is_self: bool,
    pub known: Vec<ProfileField>,
    pub unknown: Vec<ProfileField>,
    /// Edit form fields, only filled in for the member's own profile
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub editable: Vec<ProfileField>,
    pub teams: Vec<ProfileTeamRecord>,
    /// Member version, sent back as `expectedVersion` when editing
    pub version: i64,
}

/// Request body for editing one's own profile. Only editable fields are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub ntnu_mail: Option<String>,
    #[serde(default)]
    pub personal_mail: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub show_phone_nr_on_website: Option<bool>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub nationalities: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub year_of_study: Option<i32>,
    #[serde(default)]
    pub additional_comments: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl From<UpdateProfileRequest> for UpdateMemberRequest {
    fn from(request: UpdateProfileRequest) -> Self {
        UpdateMemberRequest {
            first_name: request.first_name,
            last_name: request.last_name,
            ntnu_mail: request.ntnu_mail,
            personal_mail: request.personal_mail,
            phone_number: request.phone_number,
            show_phone_nr_on_website: request.show_phone_nr_on_website,
            birthday: request.birthday,
            nationalities: request.nationalities,
            field_of_study: request.field_of_study,
            year_of_study: request.year_of_study,
            additional_comments: request.additional_comments,
            expected_version: request.expected_version,
            ..UpdateMemberRequest::default()
        }
    }
}

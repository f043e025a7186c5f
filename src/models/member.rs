//! Member model for the organization directory.

use serde::{Deserialize, Serialize};

/// An organization member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(rename = "memberID")]
    pub member_id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Organization mail, also the session identity
    pub orbit_mail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntnu_mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_phone_nr_on_website: Option<bool>,
    /// ISO date (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationalities: Option<String>,
    pub field_of_study: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_of_study: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_comments: Option<String>,
    #[serde(rename = "slackID", skip_serializing_if = "Option::is_none")]
    pub slack_id: Option<String>,
    /// Derived from open team history records; kept in sync by the roster reconciler
    pub active_status: bool,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Request body for creating a new member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub first_name: String,
    pub last_name: String,
    pub orbit_mail: String,
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
    pub field_of_study: String,
    #[serde(default)]
    pub year_of_study: Option<i32>,
    #[serde(default)]
    pub additional_comments: Option<String>,
    #[serde(rename = "slackID", default)]
    pub slack_id: Option<String>,
    /// New members start inactive until they join a team
    #[serde(default)]
    pub active_status: bool,
}

/// Request body for updating an existing member. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub orbit_mail: Option<String>,
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
    #[serde(rename = "slackID", default)]
    pub slack_id: Option<String>,
    #[serde(default)]
    pub active_status: Option<bool>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateMemberRequest {
    /// An update that only touches the derived active flag.
    pub fn active_status(active: bool) -> Self {
        Self {
            active_status: Some(active),
            ..Self::default()
        }
    }
}

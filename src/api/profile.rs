//! Profile API endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use super::{error, reindex_member, success, ApiResult};
use crate::auth::current_member_email;
use crate::errors::AppError;
use crate::models::{Member, ProfileView, UpdateMemberRequest, UpdateProfileRequest};
use crate::roster::render_profile;
use crate::AppState;

/// Member named by the session header.
async fn session_member(state: &AppState, headers: &HeaderMap) -> Result<Member, AppError> {
    let email = current_member_email(headers)
        .ok_or_else(|| AppError::Unauthorized("Sign-in required".to_string()))?;
    state
        .repo
        .get_member_by_mail(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("No member registered with mail {}", email)))
}

async fn profile_of(
    state: &AppState,
    member: &Member,
    is_self: bool,
) -> Result<ProfileView, AppError> {
    let teams = state.repo.list_teams().await?;
    let histories = state.repo.list_team_histories().await?;
    Ok(render_profile(
        member,
        is_self,
        &teams,
        &histories,
        state.config.board_team_id,
    ))
}

/// GET /api/profile/me - The signed-in member's profile, with edit fields.
pub async fn my_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ProfileView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let member = match session_member(&state, &headers).await {
        Ok(member) => member,
        Err(e) => return error(e, revision_id),
    };

    match profile_of(&state, &member, true).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/profile/:id - Another member's profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<ProfileView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let member = match state.repo.get_member(id).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Member {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    // Viewing does not require a session; it only decides what is shown
    let is_self = match current_member_email(&headers) {
        Some(email) => member.orbit_mail.eq_ignore_ascii_case(&email),
        None => false,
    };

    match profile_of(&state, &member, is_self).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/profile/me - Edit the signed-in member's own profile.
///
/// Only the fields of the edit view are accepted; anything else is a bad request.
pub async fn update_my_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<ProfileView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let request: UpdateProfileRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => return error(e.into(), revision_id),
    };

    let member = match session_member(&state, &headers).await {
        Ok(member) => member,
        Err(e) => return error(e, revision_id),
    };

    let update: UpdateMemberRequest = request.into();
    let updated = match state.repo.update_member(member.member_id, &update).await {
        Ok(updated) => updated,
        Err(e) => return error(e, revision_id),
    };
    reindex_member(&state, &updated).await;

    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    match profile_of(&state, &updated, true).await {
        Ok(view) => success(view, new_revision),
        Err(e) => error(e, new_revision),
    }
}

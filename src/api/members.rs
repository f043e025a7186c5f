//! Member API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, reindex_member, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateMemberRequest, Member, UpdateMemberRequest};
use crate::roster::{directory_listing, DirectoryListing};
use crate::AppState;

/// GET /api/members - List all members.
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_members().await {
        Ok(members) => success(members, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/members/directory - Active members by first name, then inactive members.
pub async fn member_directory(State(state): State<AppState>) -> ApiResult<DirectoryListing> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_directory().await {
        Ok(directory) => success(
            directory_listing(
                &directory.members,
                &directory.teams,
                &directory.team_histories,
                state.config.board_team_id,
            ),
            directory.revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/members/:id - Get a single member.
pub async fn get_member(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_member(id).await {
        Ok(Some(member)) => success(member, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Member {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/members - Create a new member.
pub async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_member(&request).await {
        Ok(member) => {
            reindex_member(&state, &member).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/members/:id - Update a member.
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_member(id, &request).await {
        Ok(member) => {
            reindex_member(&state, &member).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/members/:id - Delete a member without team history.
pub async fn delete_member(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_member(id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove_member(id).await {
                tracing::warn!("Failed to remove member from index: {}", e);
            }
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

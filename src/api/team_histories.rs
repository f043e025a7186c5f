//! Raw team history endpoints, restricted to board members.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use super::{error, refresh_search_index, success, ApiResult};
use crate::auth::current_member_email;
use crate::models::{CreateTeamHistoryRequest, TeamHistory};
use crate::AppState;

/// GET /api/team-histories - List all team history records.
pub async fn list_team_histories(State(state): State<AppState>) -> ApiResult<Vec<TeamHistory>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_team_histories().await {
        Ok(histories) => success(histories, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/team-histories - Open a record, e.g. a BOARD seat with its position.
pub async fn create_team_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTeamHistoryRequest>,
) -> ApiResult<TeamHistory> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let actor = current_member_email(&headers);

    let board_member = match state.reconciler.require_board(actor.as_deref()).await {
        Ok(member) => member,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.create_team_history(&request).await {
        Ok(history) => {
            tracing::info!(
                actor = board_member.member_id,
                team_history_id = history.team_history_id,
                "Opened team history record"
            );
            refresh_search_index(&state).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(history, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/team-histories/:id/terminate - Close a record at the current semester.
pub async fn terminate_team_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<TeamHistory> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let actor = current_member_email(&headers);

    let board_member = match state.reconciler.require_board(actor.as_deref()).await {
        Ok(member) => member,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.terminate_team_history(id).await {
        Ok(history) => {
            tracing::info!(
                actor = board_member.member_id,
                team_history_id = id,
                "Closed team history record"
            );
            refresh_search_index(&state).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(history, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

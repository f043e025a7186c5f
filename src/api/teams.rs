//! Team and roster API endpoints.
//!
//! Roster mutations act on behalf of the member named by the session header.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use super::{error, refresh_search_index, success, ApiResult};
use crate::auth::current_member_email;
use crate::errors::AppError;
use crate::models::{CreateTeamRequest, Team};
use crate::roster::{MutationReport, RosterView};
use crate::AppState;

/// Body naming the member a roster action applies to.
#[derive(Debug, Deserialize)]
pub struct MemberRef {
    #[serde(rename = "memberID")]
    pub member_id: i64,
}

/// Query parameters for the roster view.
#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    /// Filter for the eligible-to-add list
    #[serde(default)]
    pub q: String,
}

/// GET /api/teams - List all teams.
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Vec<Team>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_teams().await {
        Ok(teams) => success(teams, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/teams/:id - Get a single team.
pub async fn get_team(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Team> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_team(id).await {
        Ok(Some(team)) => success(team, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Team {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/teams - Create a new team.
pub async fn create_team(
    State(state): State<AppState>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<Team> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_team(&request).await {
        Ok(team) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(team, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/teams/mine - The signed-in member's current team.
pub async fn my_team(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Team> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let actor = current_member_email(&headers);

    match state.reconciler.session_team(actor.as_deref()).await {
        Ok(team) => success(team, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/teams/:id/roster - Leader, members and, for editors, who can be added.
pub async fn team_roster(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<RosterQuery>,
    headers: HeaderMap,
) -> ApiResult<RosterView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let actor = current_member_email(&headers);

    match state
        .reconciler
        .roster_view(actor.as_deref(), id, &params.q)
        .await
    {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/teams/:id/members - Add a member to the team.
pub async fn add_team_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<MemberRef>,
) -> ApiResult<MutationReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let actor = current_member_email(&headers);

    let result = state
        .reconciler
        .add_member(actor.as_deref(), id, body.member_id)
        .await;
    mutation_response(&state, result, revision_id).await
}

/// DELETE /api/teams/:id/members/:member_id - Remove a member from the team.
pub async fn remove_team_member(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> ApiResult<MutationReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let actor = current_member_email(&headers);

    let result = state
        .reconciler
        .remove_member(actor.as_deref(), id, member_id)
        .await;
    mutation_response(&state, result, revision_id).await
}

/// POST /api/teams/:id/leader - Transfer leadership to another roster member.
pub async fn transfer_leadership(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<MemberRef>,
) -> ApiResult<MutationReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let actor = current_member_email(&headers);

    let result = state
        .reconciler
        .transfer_leadership(actor.as_deref(), id, body.member_id)
        .await;
    mutation_response(&state, result, revision_id).await
}

/// Wrap a roster mutation result, re-indexing whenever something was written.
async fn mutation_response(
    state: &AppState,
    result: Result<MutationReport, AppError>,
    revision_id: i64,
) -> ApiResult<MutationReport> {
    match result {
        Ok(report) => {
            refresh_search_index(state).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(report, new_revision)
        }
        Err(e @ AppError::PartialFailure { .. }) => {
            // Earlier steps landed; clients need the new revision to refresh
            refresh_search_index(state).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            error(e, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

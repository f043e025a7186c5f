//! REST API module.
//!
//! Every handler answers with the `{success, data, revisionId}` envelope.

mod directory;
mod members;
mod profile;
mod search;
mod team_histories;
mod teams;

pub use directory::*;
pub use members::*;
pub use profile::*;
pub use search::*;
pub use team_histories::*;
pub use teams::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: crate::errors::AppError, revision_id: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Rebuild the member search index from the current directory.
///
/// Team names are part of every member document, so roster changes touch many
/// documents at once. Failures are logged and never fail the request.
async fn refresh_search_index(state: &AppState) {
    let directory = match state.repo.get_directory().await {
        Ok(directory) => directory,
        Err(e) => {
            tracing::warn!("Failed to load directory for re-indexing: {}", e);
            return;
        }
    };

    if let Err(e) = state
        .search
        .rebuild(
            &directory.members,
            &directory.teams,
            &directory.team_histories,
        )
        .await
    {
        tracing::warn!("Failed to rebuild search index: {}", e);
    }
}

/// Re-index one member after an edit that leaves the rosters untouched.
async fn reindex_member(state: &AppState, member: &crate::models::Member) {
    let (teams, histories) =
        match tokio::try_join!(state.repo.list_teams(), state.repo.list_team_histories()) {
            Ok(lists) => lists,
            Err(e) => {
                tracing::warn!("Failed to load teams for re-indexing: {}", e);
                return;
            }
        };

    if let Err(e) = state.search.index_member(member, &teams, &histories).await {
        tracing::warn!("Failed to re-index member {}: {}", member.member_id, e);
    }
}

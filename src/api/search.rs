//! Search API endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::models::Member;
use crate::roster::{current_team_name, role_label};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search results with paging metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search hit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub member: Member,
    pub current_team: String,
    pub role: String,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Search the member directory.
pub async fn search_members(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    let hits = match state.search.search(&params.q, limit, params.offset) {
        Ok(hits) => hits,
        Err(e) => return error(e, revision_id),
    };

    let directory = match state.repo.get_directory().await {
        Ok(directory) => directory,
        Err(e) => return error(e, revision_id),
    };

    // Hits for members deleted since the last commit are skipped
    let results: Vec<SearchResultItem> = hits
        .into_iter()
        .filter_map(|hit| {
            let member = directory
                .members
                .iter()
                .find(|m| m.member_id == hit.member_id)?;
            Some(SearchResultItem {
                current_team: current_team_name(
                    &directory.teams,
                    &directory.team_histories,
                    member.member_id,
                ),
                role: role_label(
                    &directory.team_histories,
                    member.member_id,
                    state.config.board_team_id,
                ),
                member: member.clone(),
                score: hit.score,
            })
        })
        .collect();

    let total = results.len();

    success(
        SearchResponse {
            results,
            total,
            limit,
            offset: params.offset,
        },
        revision_id,
    )
}

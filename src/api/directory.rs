//! Directory snapshot endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::models::{Directory, RevisionInfo};
use crate::AppState;

/// GET /api/directory - Get every member, team and team history record.
pub async fn get_directory(State(state): State<AppState>) -> ApiResult<Directory> {
    let directory = state
        .repo
        .get_directory()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    let revision_id = directory.revision_id;
    success(directory, revision_id)
}

/// GET /api/directory/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_info = state
        .repo
        .get_revision_info()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    let revision_id = revision_info.revision_id;
    success(revision_info, revision_id)
}

//! The directory store seam consumed by the roster reconciler.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{CreateTeamHistoryRequest, Member, Team, TeamHistory, UpdateMemberRequest};

/// Source of truth for members, teams and team history records.
///
/// Every call is a separate request; implementations are not expected to make
/// several calls atomic.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn list_members(&self) -> Result<Vec<Member>, AppError>;

    async fn list_teams(&self) -> Result<Vec<Team>, AppError>;

    async fn list_team_histories(&self) -> Result<Vec<TeamHistory>, AppError>;

    /// Create an open record starting in the current semester.
    async fn create_team_history(
        &self,
        request: &CreateTeamHistoryRequest,
    ) -> Result<TeamHistory, AppError>;

    /// Close a record by setting its end fields to the current semester.
    async fn terminate_team_history(&self, team_history_id: i64) -> Result<TeamHistory, AppError>;

    async fn update_member(
        &self,
        member_id: i64,
        request: &UpdateMemberRequest,
    ) -> Result<Member, AppError>;
}

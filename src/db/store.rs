use async_trait::async_trait;

use super::Repository;
use crate::errors::AppError;
use crate::models::{CreateTeamHistoryRequest, Member, Team, TeamHistory, UpdateMemberRequest};
use crate::roster::DirectoryStore;

#[async_trait]
impl DirectoryStore for Repository {
    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        Repository::list_members(self).await
    }

    async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        Repository::list_teams(self).await
    }

    async fn list_team_histories(&self) -> Result<Vec<TeamHistory>, AppError> {
        Repository::list_team_histories(self).await
    }

    async fn create_team_history(
        &self,
        request: &CreateTeamHistoryRequest,
    ) -> Result<TeamHistory, AppError> {
        Repository::create_team_history(self, request).await
    }

    async fn terminate_team_history(&self, team_history_id: i64) -> Result<TeamHistory, AppError> {
        Repository::terminate_team_history(self, team_history_id).await
    }

    async fn update_member(
        &self,
        member_id: i64,
        request: &UpdateMemberRequest,
    ) -> Result<Member, AppError> {
        Repository::update_member(self, member_id, request).await
    }
}

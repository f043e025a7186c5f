//! Roster mutations: add member, remove member and leadership transfer.
//!
//! Each operation validates against a fresh snapshot of the store, then issues
//! its writes one at a time, awaiting every write before the next. The store
//! cannot make the writes atomic, so a failure after the first write is
//! reported as [`AppError::PartialFailure`] with the steps that did land.

use std::sync::Arc;

use serde::Serialize;

use super::{
    can_edit_team, derive_roster, eligible_to_add, find_session_member, has_open_record,
    integrity_issues, open_records_for, session_team_id, DirectoryStore, IntegrityIssue,
};
use crate::errors::AppError;
use crate::models::{
    CreateTeamHistoryRequest, Member, Privilege, Team, TeamHistory, UpdateMemberRequest,
};

/// A write that was acknowledged by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppliedStep {
    Closed {
        history: TeamHistory,
    },
    Opened {
        history: TeamHistory,
    },
    ActiveStatus {
        #[serde(rename = "memberID")]
        member_id: i64,
        #[serde(rename = "activeStatus")]
        active_status: bool,
    },
}

impl AppliedStep {
    pub fn describe(&self) -> String {
        match self {
            AppliedStep::Closed { history } => format!(
                "closed team history {} (member {}, team {})",
                history.team_history_id, history.member_id, history.team_id
            ),
            AppliedStep::Opened { history } => format!(
                "opened team history {} (member {}, team {}, {})",
                history.team_history_id,
                history.member_id,
                history.team_id,
                history.privileges.as_str()
            ),
            AppliedStep::ActiveStatus {
                member_id,
                active_status,
            } => format!(
                "set member {} active status to {}",
                member_id, active_status
            ),
        }
    }
}

/// Result of a completed roster mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationReport {
    pub operation: &'static str,
    #[serde(rename = "teamID")]
    pub team_id: i64,
    #[serde(rename = "memberID")]
    pub member_id: i64,
    pub steps: Vec<AppliedStep>,
}

/// Roster of one team as seen by the signed-in member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterView {
    pub team: Team,
    pub leader: Option<Member>,
    /// Roster members other than the leader
    pub members: Vec<Member>,
    pub can_edit: bool,
    /// Members that can be added; only computed for editors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible: Option<Vec<Member>>,
    pub issues: Vec<IntegrityIssue>,
}

struct Snapshot {
    members: Vec<Member>,
    teams: Vec<Team>,
    histories: Vec<TeamHistory>,
}

impl Snapshot {
    fn team(&self, team_id: i64) -> Result<&Team, AppError> {
        self.teams
            .iter()
            .find(|t| t.team_id == team_id)
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", team_id)))
    }

    fn member(&self, member_id: i64) -> Result<&Member, AppError> {
        self.members
            .iter()
            .find(|m| m.member_id == member_id)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))
    }

    fn session_member(&self, email: Option<&str>) -> Result<&Member, AppError> {
        let email = email.ok_or_else(|| AppError::Unauthorized("Sign-in required".to_string()))?;
        find_session_member(&self.members, email).ok_or_else(|| {
            AppError::Unauthorized(format!("No member registered with mail {}", email))
        })
    }
}

/// Sequenced writes of one operation, tracking what has been applied.
struct WriteSequence<'a> {
    store: &'a dyn DirectoryStore,
    operation: &'static str,
    steps: Vec<AppliedStep>,
}

impl<'a> WriteSequence<'a> {
    fn new(store: &'a dyn DirectoryStore, operation: &'static str) -> Self {
        Self {
            store,
            operation,
            steps: Vec::new(),
        }
    }

    async fn close(&mut self, history: &TeamHistory) -> Result<TeamHistory, AppError> {
        match self
            .store
            .terminate_team_history(history.team_history_id)
            .await
        {
            Ok(closed) => {
                self.steps.push(AppliedStep::Closed {
                    history: closed.clone(),
                });
                Ok(closed)
            }
            Err(err) => Err(self.fail(
                format!("close team history {}", history.team_history_id),
                err,
            )),
        }
    }

    async fn open(
        &mut self,
        member_id: i64,
        team_id: i64,
        privileges: Privilege,
    ) -> Result<TeamHistory, AppError> {
        let request = CreateTeamHistoryRequest::new(member_id, team_id, privileges);
        match self.store.create_team_history(&request).await {
            Ok(opened) => {
                self.steps.push(AppliedStep::Opened {
                    history: opened.clone(),
                });
                Ok(opened)
            }
            Err(err) => Err(self.fail(
                format!(
                    "open {} record for member {} in team {}",
                    privileges.as_str(),
                    member_id,
                    team_id
                ),
                err,
            )),
        }
    }

    async fn set_active(&mut self, member_id: i64, active: bool) -> Result<Member, AppError> {
        let request = UpdateMemberRequest::active_status(active);
        match self.store.update_member(member_id, &request).await {
            Ok(member) => {
                self.steps.push(AppliedStep::ActiveStatus {
                    member_id,
                    active_status: active,
                });
                Ok(member)
            }
            Err(err) => Err(self.fail(
                format!("set member {} active status to {}", member_id, active),
                err,
            )),
        }
    }

    async fn reload_histories(&mut self) -> Result<Vec<TeamHistory>, AppError> {
        match self.store.list_team_histories().await {
            Ok(histories) => Ok(histories),
            Err(err) => Err(self.fail("re-read team histories".to_string(), err)),
        }
    }

    fn fail(&self, step: String, err: AppError) -> AppError {
        if self.steps.is_empty() {
            tracing::warn!(
                operation = self.operation,
                step = %step,
                "Roster write failed: {}",
                err
            );
            return err;
        }

        let completed_steps: Vec<String> = self.steps.iter().map(AppliedStep::describe).collect();
        tracing::error!(
            operation = self.operation,
            step = %step,
            completed = completed_steps.len(),
            "Roster update partially applied: {}",
            err
        );
        AppError::PartialFailure {
            message: format!(
                "{} stopped at '{}' after {} applied write(s): {}. Refresh the roster before trying again.",
                self.operation,
                step,
                completed_steps.len(),
                err.message()
            ),
            completed_steps,
            failed_step: step,
        }
    }

    fn finish(self, team_id: i64, member_id: i64) -> MutationReport {
        MutationReport {
            operation: self.operation,
            team_id,
            member_id,
            steps: self.steps,
        }
    }
}

/// Orchestrates roster mutations against a [`DirectoryStore`].
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn DirectoryStore>,
    board_team_id: i64,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DirectoryStore>, board_team_id: i64) -> Self {
        Self {
            store,
            board_team_id,
        }
    }

    async fn load(&self) -> Result<Snapshot, AppError> {
        let members = self.store.list_members().await?;
        let teams = self.store.list_teams().await?;
        let histories = self.store.list_team_histories().await?;
        Ok(Snapshot {
            members,
            teams,
            histories,
        })
    }

    fn team_issues(&self, histories: &[TeamHistory], team_id: i64) -> Vec<IntegrityIssue> {
        integrity_issues(histories, &[self.board_team_id])
            .into_iter()
            .filter(|issue| issue.team_id() == team_id)
            .collect()
    }

    /// Resolve the signed-in member and check they may edit the team.
    fn authorize<'s>(
        &self,
        snapshot: &'s Snapshot,
        actor_email: Option<&str>,
        team_id: i64,
    ) -> Result<&'s Member, AppError> {
        let actor = snapshot.session_member(actor_email)?;
        let team = snapshot.team(team_id)?;
        if !can_edit_team(
            &snapshot.histories,
            actor.member_id,
            team_id,
            self.board_team_id,
        ) {
            return Err(AppError::Forbidden(format!(
                "Only the leader of {} or board members can edit this team",
                team.team_name
            )));
        }
        Ok(actor)
    }

    /// Roster of a team; editors also get the eligible-to-add list filtered by `query`.
    pub async fn roster_view(
        &self,
        actor_email: Option<&str>,
        team_id: i64,
        query: &str,
    ) -> Result<RosterView, AppError> {
        let snapshot = self.load().await?;
        let team = snapshot.team(team_id)?.clone();
        let roster = derive_roster(&snapshot.members, &snapshot.histories, team_id);

        let can_edit = actor_email
            .and_then(|email| find_session_member(&snapshot.members, email))
            .is_some_and(|actor| {
                can_edit_team(
                    &snapshot.histories,
                    actor.member_id,
                    team_id,
                    self.board_team_id,
                )
            });

        let eligible = can_edit
            .then(|| eligible_to_add(&snapshot.members, &snapshot.histories, team_id, query));

        Ok(RosterView {
            members: roster.others(),
            leader: roster.leader,
            team,
            can_edit,
            eligible,
            issues: self.team_issues(&snapshot.histories, team_id),
        })
    }

    /// The team the signed-in member currently belongs to.
    pub async fn session_team(&self, actor_email: Option<&str>) -> Result<Team, AppError> {
        let snapshot = self.load().await?;
        let actor = snapshot.session_member(actor_email)?;
        let team_id = session_team_id(&snapshot.histories, actor.member_id).ok_or_else(|| {
            AppError::NotFound(format!("{} is not on any team", actor.full_name()))
        })?;
        snapshot.team(team_id).cloned()
    }

    /// Resolve the signed-in member and require a current board seat.
    pub async fn require_board(&self, actor_email: Option<&str>) -> Result<Member, AppError> {
        let snapshot = self.load().await?;
        let actor = snapshot.session_member(actor_email)?;
        if !can_edit_team(
            &snapshot.histories,
            actor.member_id,
            self.board_team_id,
            self.board_team_id,
        ) {
            return Err(AppError::Forbidden(
                "Only board members can edit team history records directly".to_string(),
            ));
        }
        Ok(actor.clone())
    }

    /// Close the member's open record in the team, then mark them inactive if
    /// they no longer hold an open record anywhere.
    pub async fn remove_member(
        &self,
        actor_email: Option<&str>,
        team_id: i64,
        member_id: i64,
    ) -> Result<MutationReport, AppError> {
        let snapshot = self.load().await?;
        let actor = self.authorize(&snapshot, actor_email, team_id)?;
        let member = snapshot.member(member_id)?;

        let open = open_records_for(&snapshot.histories, member_id, team_id);
        if open.is_empty() {
            return Err(AppError::NotFound(format!(
                "{} has no open record in team {}",
                member.full_name(),
                team_id
            )));
        }
        if open.iter().any(|h| h.privileges == Privilege::Leader) {
            tracing::warn!(
                team_id,
                member_id,
                "Removing the team leader leaves the team without one"
            );
        }

        tracing::info!(
            actor = actor.member_id,
            team_id,
            member_id,
            "Removing member from team"
        );

        let mut writes = WriteSequence::new(self.store.as_ref(), "remove member");
        // Duplicates are closed too, restoring a single open record per pair
        for history in open {
            writes.close(history).await?;
        }

        let histories = writes.reload_histories().await?;
        if !has_open_record(&histories, member_id) {
            writes.set_active(member_id, false).await?;
        }

        Ok(writes.finish(team_id, member_id))
    }

    /// Open a MEMBER record for the member in the team and mark them active.
    pub async fn add_member(
        &self,
        actor_email: Option<&str>,
        team_id: i64,
        member_id: i64,
    ) -> Result<MutationReport, AppError> {
        let snapshot = self.load().await?;
        let actor = self.authorize(&snapshot, actor_email, team_id)?;
        let member = snapshot.member(member_id)?;

        if !open_records_for(&snapshot.histories, member_id, team_id).is_empty() {
            return Err(AppError::conflict(format!(
                "{} is already on team {}",
                member.full_name(),
                team_id
            )));
        }

        tracing::info!(
            actor = actor.member_id,
            team_id,
            member_id,
            "Adding member to team"
        );

        let mut writes = WriteSequence::new(self.store.as_ref(), "add member");
        writes.open(member_id, team_id, Privilege::Member).await?;
        writes.set_active(member_id, true).await?;

        Ok(writes.finish(team_id, member_id))
    }

    /// Hand the team's leadership to another roster member.
    ///
    /// Both old records are closed before the new ones are opened, so a pair
    /// never has two open records at once.
    pub async fn transfer_leadership(
        &self,
        actor_email: Option<&str>,
        team_id: i64,
        new_leader_id: i64,
    ) -> Result<MutationReport, AppError> {
        let snapshot = self.load().await?;
        let actor = self.authorize(&snapshot, actor_email, team_id)?;

        let blocking: Vec<String> = self
            .team_issues(&snapshot.histories, team_id)
            .iter()
            .filter(|issue| !matches!(issue, IntegrityIssue::MissingLeader { .. }))
            .map(IntegrityIssue::describe)
            .collect();
        if !blocking.is_empty() {
            return Err(AppError::conflict(format!(
                "Roster is inconsistent ({}); refresh and repair it before transferring leadership",
                blocking.join("; ")
            )));
        }

        let roster = derive_roster(&snapshot.members, &snapshot.histories, team_id);
        let outgoing = roster
            .leader
            .as_ref()
            .ok_or_else(|| AppError::NotFound(format!("Team {} has no current leader", team_id)))?;
        if outgoing.member_id == new_leader_id {
            return Err(AppError::conflict(format!(
                "{} already leads this team",
                outgoing.full_name()
            )));
        }
        if !roster.contains(new_leader_id) {
            return Err(AppError::NotFound(format!(
                "Member {} is not on the roster of team {}",
                new_leader_id, team_id
            )));
        }
        let incoming = snapshot.member(new_leader_id)?;

        let outgoing_record = open_records_for(&snapshot.histories, outgoing.member_id, team_id)
            .into_iter()
            .find(|h| h.privileges == Privilege::Leader)
            .ok_or_else(|| {
                AppError::NotFound(format!("No open leader record for {}", outgoing.full_name()))
            })?;
        let incoming_record = open_records_for(&snapshot.histories, incoming.member_id, team_id)
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::NotFound(format!("No open record for {}", incoming.full_name()))
            })?;

        tracing::info!(
            actor = actor.member_id,
            team_id,
            from = outgoing.member_id,
            to = incoming.member_id,
            "Transferring team leadership"
        );

        let mut writes = WriteSequence::new(self.store.as_ref(), "transfer leadership");
        writes.close(outgoing_record).await?;
        writes.close(incoming_record).await?;
        writes
            .open(incoming.member_id, team_id, Privilege::Leader)
            .await?;
        writes
            .open(outgoing.member_id, team_id, Privilege::Member)
            .await?;

        Ok(writes.finish(team_id, new_leader_id))
    }
}

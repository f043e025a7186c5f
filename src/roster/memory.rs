//! In-memory directory store with write fault injection, for reconciler tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::DirectoryStore;
use crate::errors::AppError;
use crate::models::{
    CreateTeamHistoryRequest, Member, Privilege, Semester, SemesterDate, Team, TeamHistory,
    UpdateMemberRequest,
};

#[derive(Default)]
struct MemoryState {
    members: Vec<Member>,
    teams: Vec<Team>,
    histories: Vec<TeamHistory>,
    writes: usize,
    /// Writes numbered from 1; the write with this number fails
    fail_at: Option<usize>,
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    now: SemesterDate,
}

impl MemoryStore {
    pub fn new(members: Vec<Member>, teams: Vec<Team>, histories: Vec<TeamHistory>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                members,
                teams,
                histories,
                ..MemoryState::default()
            }),
            now: SemesterDate {
                semester: Semester::Fall,
                year: 2024,
            },
        }
    }

    /// Make the `n`-th write from now fail (1 = the next write).
    pub fn fail_write(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.fail_at = Some(state.writes + n);
    }

    pub fn histories(&self) -> Vec<TeamHistory> {
        self.state.lock().unwrap().histories.clone()
    }

    pub fn member(&self, member_id: i64) -> Member {
        self.state
            .lock()
            .unwrap()
            .members
            .iter()
            .find(|m| m.member_id == member_id)
            .cloned()
            .unwrap()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    /// Open (member, team, privilege) triples, sorted.
    pub fn open_records(&self) -> Vec<(i64, i64, Privilege)> {
        let mut open: Vec<(i64, i64, Privilege)> = self
            .histories()
            .iter()
            .filter(|h| h.is_open())
            .map(|h| (h.member_id, h.team_id, h.privileges))
            .collect();
        open.sort_by_key(|(member, team, privilege)| (*member, *team, privilege.as_str()));
        open
    }
}

impl MemoryState {
    fn begin_write(&mut self) -> Result<(), AppError> {
        self.writes += 1;
        if self.fail_at == Some(self.writes) {
            return Err(AppError::Database("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        Ok(self.state.lock().unwrap().members.clone())
    }

    async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        Ok(self.state.lock().unwrap().teams.clone())
    }

    async fn list_team_histories(&self) -> Result<Vec<TeamHistory>, AppError> {
        Ok(self.histories())
    }

    async fn create_team_history(
        &self,
        request: &CreateTeamHistoryRequest,
    ) -> Result<TeamHistory, AppError> {
        let mut state = self.state.lock().unwrap();
        state.begin_write()?;

        if state
            .histories
            .iter()
            .any(|h| h.member_id == request.member_id && h.is_open_in(request.team_id))
        {
            return Err(AppError::conflict("open record already exists"));
        }

        let history = TeamHistory {
            team_history_id: state
                .histories
                .iter()
                .map(|h| h.team_history_id)
                .max()
                .unwrap_or(0)
                + 1,
            member_id: request.member_id,
            team_id: request.team_id,
            privileges: request.privileges,
            c_position: request.c_position.clone(),
            start_sem: self.now.semester,
            start_year: self.now.year,
            end_sem: None,
            end_year: None,
        };
        state.histories.push(history.clone());
        Ok(history)
    }

    async fn terminate_team_history(&self, team_history_id: i64) -> Result<TeamHistory, AppError> {
        let mut state = self.state.lock().unwrap();
        state.begin_write()?;

        let history = state
            .histories
            .iter_mut()
            .find(|h| h.team_history_id == team_history_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Team history {} not found", team_history_id))
            })?;
        if !history.is_open() {
            return Err(AppError::conflict("already closed"));
        }
        history.end_sem = Some(self.now.semester);
        history.end_year = Some(self.now.year);
        Ok(history.clone())
    }

    async fn update_member(
        &self,
        member_id: i64,
        request: &UpdateMemberRequest,
    ) -> Result<Member, AppError> {
        let mut state = self.state.lock().unwrap();
        state.begin_write()?;

        let member = state
            .members
            .iter_mut()
            .find(|m| m.member_id == member_id)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;
        if let Some(active) = request.active_status {
            member.active_status = active;
        }
        member.version += 1;
        Ok(member.clone())
    }
}

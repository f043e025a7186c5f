//! Database repository for CRUD operations.
//!
//! Every write bumps the revision in `meta` so clients can detect changes.

use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateMemberRequest, CreateTeamHistoryRequest, CreateTeamRequest, Directory, Member, Privilege,
    RevisionInfo, Semester, SemesterDate, Team, TeamHistory, UpdateMemberRequest,
};

const MEMBER_COLUMNS: &str = "member_id, first_name, last_name, orbit_mail, ntnu_mail, personal_mail, phone_number, show_phone_nr_on_website, birthday, nationalities, field_of_study, year_of_study, additional_comments, slack_id, active_status, updated_at, version";

const HISTORY_COLUMNS: &str = "team_history_id, member_id, team_id, priviledges, c_position, start_sem, start_year, end_sem, end_year";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    /// Get the full directory snapshot.
    pub async fn get_directory(&self) -> Result<Directory, AppError> {
        let meta =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        let members = self.list_members().await?;
        let teams = self.list_teams().await?;
        let team_histories = self.list_team_histories().await?;

        Ok(Directory {
            schema_version: meta.get("schema_version"),
            revision_id: meta.get("revision_id"),
            generated_at: meta.get("generated_at"),
            members,
            teams,
            team_histories,
        })
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members.
    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members ORDER BY member_id",
            MEMBER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    /// Get a member by ID.
    pub async fn get_member(&self, member_id: i64) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM members WHERE member_id = ?",
            MEMBER_COLUMNS
        ))
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    /// Look a member up by organization mail (case-insensitive).
    pub async fn get_member_by_mail(&self, orbit_mail: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM members WHERE orbit_mail = ? COLLATE NOCASE",
            MEMBER_COLUMNS
        ))
        .bind(orbit_mail.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    /// Create a new member.
    pub async fn create_member(&self, request: &CreateMemberRequest) -> Result<Member, AppError> {
        require_text("firstName", &request.first_name)?;
        require_text("lastName", &request.last_name)?;
        validate_mail(&request.orbit_mail)?;
        if let Some(birthday) = &request.birthday {
            validate_birthday(birthday)?;
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO members (first_name, last_name, orbit_mail, ntnu_mail, personal_mail, phone_number, show_phone_nr_on_website, birthday, nationalities, field_of_study, year_of_study, additional_comments, slack_id, active_status, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(request.orbit_mail.trim())
        .bind(&request.ntnu_mail)
        .bind(&request.personal_mail)
        .bind(&request.phone_number)
        .bind(request.show_phone_nr_on_website.map(|b| b as i32))
        .bind(&request.birthday)
        .bind(&request.nationalities)
        .bind(&request.field_of_study)
        .bind(request.year_of_study)
        .bind(&request.additional_comments)
        .bind(&request.slack_id)
        .bind(request.active_status as i32)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        let member_id = result.last_insert_rowid();
        self.get_member(member_id).await?.ok_or_else(|| {
            AppError::Internal(format!("Member {} vanished after insert", member_id))
        })
    }

    /// Update a member with optimistic concurrency control.
    pub async fn update_member(
        &self,
        member_id: i64,
        request: &UpdateMemberRequest,
    ) -> Result<Member, AppError> {
        let existing = self
            .get_member(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::version_mismatch(
                    format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    existing.version,
                ));
            }
        }

        if let Some(first_name) = &request.first_name {
            require_text("firstName", first_name)?;
        }
        if let Some(last_name) = &request.last_name {
            require_text("lastName", last_name)?;
        }
        if let Some(orbit_mail) = &request.orbit_mail {
            validate_mail(orbit_mail)?;
        }
        if let Some(birthday) = &request.birthday {
            validate_birthday(birthday)?;
        }

        let now = Utc::now().to_rfc3339();
        let updated = Member {
            member_id,
            first_name: request
                .first_name
                .as_deref()
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or(existing.first_name),
            last_name: request
                .last_name
                .as_deref()
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or(existing.last_name),
            orbit_mail: request
                .orbit_mail
                .as_deref()
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or(existing.orbit_mail),
            ntnu_mail: request.ntnu_mail.clone().or(existing.ntnu_mail),
            personal_mail: request.personal_mail.clone().or(existing.personal_mail),
            phone_number: request.phone_number.clone().or(existing.phone_number),
            show_phone_nr_on_website: request
                .show_phone_nr_on_website
                .or(existing.show_phone_nr_on_website),
            birthday: request.birthday.clone().or(existing.birthday),
            nationalities: request.nationalities.clone().or(existing.nationalities),
            field_of_study: request
                .field_of_study
                .clone()
                .unwrap_or(existing.field_of_study),
            year_of_study: request.year_of_study.or(existing.year_of_study),
            additional_comments: request
                .additional_comments
                .clone()
                .or(existing.additional_comments),
            slack_id: request.slack_id.clone().or(existing.slack_id),
            active_status: request.active_status.unwrap_or(existing.active_status),
            updated_at: now,
            version: existing.version + 1,
        };

        // Conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            "UPDATE members SET first_name = ?, last_name = ?, orbit_mail = ?, ntnu_mail = ?, personal_mail = ?, phone_number = ?, show_phone_nr_on_website = ?, birthday = ?, nationalities = ?, field_of_study = ?, year_of_study = ?, additional_comments = ?, slack_id = ?, active_status = ?, updated_at = ?, version = ? WHERE member_id = ? AND version = ?"
        )
        .bind(&updated.first_name)
        .bind(&updated.last_name)
        .bind(&updated.orbit_mail)
        .bind(&updated.ntnu_mail)
        .bind(&updated.personal_mail)
        .bind(&updated.phone_number)
        .bind(updated.show_phone_nr_on_website.map(|b| b as i32))
        .bind(&updated.birthday)
        .bind(&updated.nationalities)
        .bind(&updated.field_of_study)
        .bind(updated.year_of_study)
        .bind(&updated.additional_comments)
        .bind(&updated.slack_id)
        .bind(updated.active_status as i32)
        .bind(&updated.updated_at)
        .bind(updated.version)
        .bind(member_id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Version changed between read and write
            let current = self.get_member(member_id).await?;
            return Err(AppError::version_mismatch(
                "Concurrent modification detected",
                current.map(|m| m.version).unwrap_or(0),
            ));
        }

        self.increment_revision().await?;

        Ok(updated)
    }

    /// Delete a member. Members with team history cannot be deleted.
    pub async fn delete_member(&self, member_id: i64) -> Result<(), AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM team_histories WHERE member_id = ?")
            .bind(member_id)
            .fetch_one(&self.pool)
            .await?;
        let history_count: i64 = row.get("n");
        if history_count > 0 {
            return Err(AppError::conflict(format!(
                "Member {} has {} team history record(s) and cannot be deleted",
                member_id, history_count
            )));
        }

        let result = sqlx::query("DELETE FROM members WHERE member_id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", member_id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== TEAM OPERATIONS ====================

    /// List all teams.
    pub async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        let rows = sqlx::query("SELECT team_id, team_name FROM teams ORDER BY team_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(team_from_row).collect())
    }

    /// Get a team by ID.
    pub async fn get_team(&self, team_id: i64) -> Result<Option<Team>, AppError> {
        let row = sqlx::query("SELECT team_id, team_name FROM teams WHERE team_id = ?")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(team_from_row))
    }

    /// Create a new team.
    pub async fn create_team(&self, request: &CreateTeamRequest) -> Result<Team, AppError> {
        require_text("teamName", &request.team_name)?;

        let team_name = request.team_name.trim().to_string();
        let result = sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(&team_name)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;

        Ok(Team {
            team_id: result.last_insert_rowid(),
            team_name,
        })
    }

    // ==================== TEAM HISTORY OPERATIONS ====================

    /// List all team history records in insertion order.
    pub async fn list_team_histories(&self) -> Result<Vec<TeamHistory>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM team_histories ORDER BY team_history_id",
            HISTORY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(history_from_row).collect()
    }

    /// Get a team history record by ID.
    pub async fn get_team_history(
        &self,
        team_history_id: i64,
    ) -> Result<Option<TeamHistory>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM team_histories WHERE team_history_id = ?",
            HISTORY_COLUMNS
        ))
        .bind(team_history_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(history_from_row).transpose()
    }

    /// Open a record starting in the current semester.
    pub async fn create_team_history(
        &self,
        request: &CreateTeamHistoryRequest,
    ) -> Result<TeamHistory, AppError> {
        self.open_team_history(request, SemesterDate::current())
            .await
    }

    /// Open a record starting at `start`.
    pub async fn open_team_history(
        &self,
        request: &CreateTeamHistoryRequest,
        start: SemesterDate,
    ) -> Result<TeamHistory, AppError> {
        if self.get_member(request.member_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Member {} not found",
                request.member_id
            )));
        }
        if self.get_team(request.team_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Team {} not found",
                request.team_id
            )));
        }

        let c_position = match request.privileges {
            Privilege::Board => {
                let position = request
                    .c_position
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation("cPosition is required for BOARD records".to_string())
                    })?;
                Some(position.to_string())
            }
            _ => None,
        };

        // The partial unique index rejects a second open record as well; this
        // check gives the caller a readable message.
        let open = sqlx::query(
            "SELECT team_history_id FROM team_histories WHERE member_id = ? AND team_id = ? AND end_sem IS NULL AND end_year IS NULL",
        )
        .bind(request.member_id)
        .bind(request.team_id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = open {
            let existing: i64 = row.get("team_history_id");
            return Err(AppError::conflict(format!(
                "Member {} already has open record {} in team {}",
                request.member_id, existing, request.team_id
            )));
        }

        let result = sqlx::query(
            "INSERT INTO team_histories (member_id, team_id, priviledges, c_position, start_sem, start_year) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(request.member_id)
        .bind(request.team_id)
        .bind(request.privileges.as_str())
        .bind(&c_position)
        .bind(start.semester.as_str())
        .bind(start.year)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(TeamHistory {
            team_history_id: result.last_insert_rowid(),
            member_id: request.member_id,
            team_id: request.team_id,
            privileges: request.privileges,
            c_position,
            start_sem: start.semester,
            start_year: start.year,
            end_sem: None,
            end_year: None,
        })
    }

    /// Close an open record at the current semester.
    pub async fn terminate_team_history(
        &self,
        team_history_id: i64,
    ) -> Result<TeamHistory, AppError> {
        let existing = self
            .get_team_history(team_history_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Team history {} not found", team_history_id))
            })?;
        if !existing.is_open() {
            return Err(AppError::conflict(format!(
                "Team history {} is already closed",
                team_history_id
            )));
        }

        let end = SemesterDate::current();
        let result = sqlx::query(
            "UPDATE team_histories SET end_sem = ?, end_year = ? WHERE team_history_id = ? AND end_sem IS NULL AND end_year IS NULL",
        )
        .bind(end.semester.as_str())
        .bind(end.year)
        .bind(team_history_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict(format!(
                "Team history {} was closed concurrently",
                team_history_id
            )));
        }

        self.increment_revision().await?;

        Ok(TeamHistory {
            end_sem: Some(end.semester),
            end_year: Some(end.year),
            ..existing
        })
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validate_mail(mail: &str) -> Result<(), AppError> {
    let mail = mail.trim();
    match mail.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation(format!(
            "orbitMail '{}' is not a mail address",
            mail
        ))),
    }
}

fn validate_birthday(birthday: &str) -> Result<(), AppError> {
    NaiveDate::parse_from_str(birthday, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| {
            AppError::Validation(format!("birthday '{}' is not a YYYY-MM-DD date", birthday))
        })
}

// Helper functions for row conversion

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    let show_phone: Option<i32> = row.get("show_phone_nr_on_website");
    let active: i32 = row.get("active_status");
    Member {
        member_id: row.get("member_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        orbit_mail: row.get("orbit_mail"),
        ntnu_mail: row.get("ntnu_mail"),
        personal_mail: row.get("personal_mail"),
        phone_number: row.get("phone_number"),
        show_phone_nr_on_website: show_phone.map(|v| v != 0),
        birthday: row.get("birthday"),
        nationalities: row.get("nationalities"),
        field_of_study: row.get("field_of_study"),
        year_of_study: row.get("year_of_study"),
        additional_comments: row.get("additional_comments"),
        slack_id: row.get("slack_id"),
        active_status: active != 0,
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

fn team_from_row(row: &sqlx::sqlite::SqliteRow) -> Team {
    Team {
        team_id: row.get("team_id"),
        team_name: row.get("team_name"),
    }
}

fn history_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<TeamHistory, AppError> {
    let privileges: String = row.get("priviledges");
    let start_sem: String = row.get("start_sem");
    let end_sem: Option<String> = row.get("end_sem");

    Ok(TeamHistory {
        team_history_id: row.get("team_history_id"),
        member_id: row.get("member_id"),
        team_id: row.get("team_id"),
        privileges: Privilege::from_str(&privileges)
            .ok_or_else(|| AppError::Database(format!("Unknown privilege '{}'", privileges)))?,
        c_position: row.get("c_position"),
        start_sem: parse_semester(&start_sem)?,
        start_year: row.get("start_year"),
        end_sem: end_sem.as_deref().map(parse_semester).transpose()?,
        end_year: row.get("end_year"),
    })
}

fn parse_semester(s: &str) -> Result<Semester, AppError> {
    Semester::from_str(s).ok_or_else(|| AppError::Database(format!("Unknown semester '{}'", s)))
}

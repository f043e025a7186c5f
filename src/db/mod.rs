//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for members, teams and team history records.

mod repository;
mod store;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            member_id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            orbit_mail TEXT NOT NULL UNIQUE COLLATE NOCASE,
            ntnu_mail TEXT,
            personal_mail TEXT,
            phone_number TEXT,
            show_phone_nr_on_website INTEGER,
            birthday TEXT,
            nationalities TEXT,
            field_of_study TEXT NOT NULL DEFAULT '',
            year_of_study INTEGER,
            additional_comments TEXT,
            slack_id TEXT,
            active_status INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            team_id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_name TEXT NOT NULL UNIQUE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_histories (
            team_history_id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL REFERENCES members(member_id),
            team_id INTEGER NOT NULL REFERENCES teams(team_id),
            priviledges TEXT NOT NULL CHECK (priviledges IN ('LEADER', 'BOARD', 'MEMBER')),
            c_position TEXT,
            start_sem TEXT NOT NULL CHECK (start_sem IN ('SPRING', 'FALL')),
            start_year INTEGER NOT NULL,
            end_sem TEXT CHECK (end_sem IN ('SPRING', 'FALL')),
            end_year INTEGER,
            CHECK ((end_sem IS NULL) = (end_year IS NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // At most one open record per (member, team)
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_team_histories_open
            ON team_histories(member_id, team_id)
            WHERE end_sem IS NULL AND end_year IS NULL;
        CREATE INDEX IF NOT EXISTS idx_team_histories_team ON team_histories(team_id);
        CREATE INDEX IF NOT EXISTS idx_members_first_name ON members(first_name);
        CREATE INDEX IF NOT EXISTS idx_members_active ON members(active_status);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

//! Configuration module for the Orbit backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Team whose current members may edit every roster
    pub board_team_id: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("ORBIT_API_PSK").ok();

        let db_path = env::var("ORBIT_DB_PATH")
            .unwrap_or_else(|_| "./data/orbit.sqlite".to_string())
            .into();

        let index_path = env::var("ORBIT_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("ORBIT_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid ORBIT_BIND_ADDR format");

        let log_level = env::var("ORBIT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let board_team_id = env::var("ORBIT_BOARD_TEAM_ID")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            board_team_id,
        }
    }
}

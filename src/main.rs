//! Orbit Backend
//!
//! REST backend for the member directory and team rosters, with SQLite
//! persistence and Tantivy full-text member search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod roster;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use roster::Reconciler;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub reconciler: Reconciler,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>, config: Config) -> Self {
        let reconciler = Reconciler::new(repo.clone(), config.board_team_id);
        Self {
            repo,
            search,
            reconciler,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Orbit backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Board team: {}", config.board_team_id);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (ORBIT_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let directory = repo.get_directory().await?;
    search
        .rebuild(
            &directory.members,
            &directory.teams,
            &directory.team_histories,
        )
        .await?;

    // Surface roster inconsistencies left behind by interrupted updates
    for issue in roster::integrity_issues(&directory.team_histories, &[config.board_team_id]) {
        tracing::warn!(
            team_id = issue.team_id(),
            "Roster integrity issue: {}",
            issue.describe()
        );
    }

    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, search, config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Directory
        .route("/directory", get(api::get_directory))
        .route("/directory/revision", get(api::get_revision))
        // Members
        .route("/members", get(api::list_members))
        .route("/members", post(api::create_member))
        .route("/members/directory", get(api::member_directory))
        .route("/members/{id}", get(api::get_member))
        .route("/members/{id}", put(api::update_member))
        .route("/members/{id}", delete(api::delete_member))
        // Teams and rosters
        .route("/teams", get(api::list_teams))
        .route("/teams", post(api::create_team))
        .route("/teams/mine", get(api::my_team))
        .route("/teams/{id}", get(api::get_team))
        .route("/teams/{id}/roster", get(api::team_roster))
        .route("/teams/{id}/members", post(api::add_team_member))
        .route(
            "/teams/{id}/members/{member_id}",
            delete(api::remove_team_member),
        )
        .route("/teams/{id}/leader", post(api::transfer_leadership))
        // Team histories
        .route("/team-histories", get(api::list_team_histories))
        .route("/team-histories", post(api::create_team_history))
        .route(
            "/team-histories/{id}/terminate",
            post(api::terminate_team_history),
        )
        // Profiles
        .route("/profile/me", get(api::my_profile))
        .route("/profile/me", put(api::update_my_profile))
        .route("/profile/{id}", get(api::get_profile))
        // Search
        .route("/search", get(api::search_members))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;

use axum::Router;
use sqlx::PgPool;

/// Human-readable application name, used in logs and seeded data.
pub const APP_NAME: &str = "QA³";

/// Shared state available to all handlers via Axum's state extractor.
///
/// The pool is constructed once at process start and dropped on shutdown;
/// nothing here is ambient or lazily created. Scoped database handles are
/// derived from the pool per request by the access-tier extractors.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: config::Config,
    pub http: reqwest::Client,
}

/// API routes. Merged with nothing else — the whole surface lives under /api.
pub fn routes(_state: AppState) -> Router<AppState> {
    Router::new()
        .merge(features::auth::routes())
        .merge(features::accounts::routes())
        .merge(features::organizations::routes())
        .merge(features::projects::routes())
        .merge(features::test_configs::routes())
        .merge(features::test_sessions::routes())
        .merge(features::test_execution::routes())
        .merge(features::test_results::routes())
        .merge(features::bug_tickets::routes())
        .merge(features::test_reports::routes())
        .merge(features::job_queue::routes())
        .merge(features::integrations::routes())
}

pub mod access;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod features;
pub mod report;
pub mod session;
pub mod tenant;

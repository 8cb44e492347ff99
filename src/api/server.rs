use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{auth, home, jobs, middleware, profile};
use crate::conf::Settings;
use crate::db::{self, auth::AuthService};
use crate::error::AppError;
use crate::session::Sessions;

const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

pub struct AppState {
    pub db: SqlitePool,
    pub auth: Arc<AuthService>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(db: SqlitePool, jwt_secret: &str, session_ttl_secs: i64) -> Arc<Self> {
        Arc::new(AppState {
            auth: Arc::new(AuthService::new(db.clone(), jwt_secret, session_ttl_secs)),
            db,
            sessions: Sessions::new(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home::home))
        .route("/job-board", get(home::home))
        .route("/jobs", get(jobs::listing))
        .route("/jobs/{id}", get(jobs::detail))
        .route("/post-job", get(jobs::post_form).post(jobs::post_submit))
        .route("/profile", get(profile::show).post(profile::update))
        .route("/auth", get(auth::show).post(auth::submit))
        .route("/sign-out", post(auth::sign_out))
        .layer(from_fn_with_state(state.clone(), middleware::attach_session))
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Closes stale client sessions and deletes expired session rows.
async fn sweep(state: &AppState) {
    let pruned = state.sessions.prune().await;
    if pruned > 0 {
        tracing::info!("pruned {pruned} stale client sessions");
    }
    match state.auth.purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!("purged {purged} expired session rows"),
        Err(err) => tracing::error!("error purging expired sessions: {err}"),
    }
}

pub async fn start_server(settings: &Settings) -> Result<(), AppError> {
    let pool = db::connect(&settings.database_url, settings.database_max_connections).await?;
    let state = AppState::new(pool, &settings.jwt_secret, settings.session_ttl_secs);

    let pruning = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            sweep(&pruning).await;
        }
    });

    let app = router(state);
    let listener = TcpListener::bind(&settings.listen_addr).await?;
    tracing::info!("Server running on http://{}", settings.listen_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

//! HTTP surface: axum handlers over [`cofound_matching::Matchmaker`].

pub mod error;
pub mod extract;
pub mod matches;
pub mod messages;
pub mod middleware;
pub mod profiles;
pub mod state;
pub mod users;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tracing::error;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// Run blocking database work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed"))
    })?
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .with_state(state.clone());

    // Token only: the caller may not have a profile yet.
    let onboarding_routes = Router::new()
        .route("/users/onboarding", post(users::onboarding))
        .layer(from_fn_with_state(state.clone(), middleware::require_token))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users/{user_id}", get(users::get_profile))
        .route("/matches", get(matches::list_matches))
        .route("/matches/recommendations", get(matches::recommendations))
        .route("/matches/invite/{target_id}", post(matches::invite))
        .route("/matches/{match_id}", get(matches::get_match))
        .route("/matches/{match_id}/intro", post(matches::request_introduction))
        .route("/matches/{match_id}/intro/respond", post(matches::respond_to_introduction))
        .route("/matches/{match_id}/status", put(matches::update_status))
        .route("/messages", get(messages::get_conversations).post(messages::send_message))
        .route("/messages/unread/count", get(messages::unread_count))
        .route("/messages/match/{match_id}/read-all", put(messages::mark_all_read))
        // Same parameter name at the same depth: a match id for the thread,
        // a message id for `/read`.
        .route("/messages/{id}", get(messages::get_messages))
        .route("/messages/{id}/read", put(messages::mark_read))
        .route("/profiles/discover", get(profiles::discover))
        .route("/profiles/saved", get(profiles::saved))
        .route("/profiles/skipped", get(profiles::skipped))
        .route("/profiles/count", get(profiles::counts))
        .route("/profiles/{user_id}/save", post(profiles::save))
        .route("/profiles/{user_id}/skip", post(profiles::skip))
        // Layers run bottom-up: token first, then user lookup.
        .layer(from_fn_with_state(state.clone(), middleware::require_user))
        .layer(from_fn_with_state(state.clone(), middleware::require_token))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(onboarding_routes)
        .merge(protected_routes)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mm = state.matchmaker.clone();
    let db_ok = run_blocking(move || {
        Ok(mm
            .db()
            .with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?))?)
    })
    .await
    .is_ok();

    let (status, label, database) = if db_ok {
        (StatusCode::OK, "healthy", "connected")
    } else {
        error!("Database health check failed");
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };
    (
        status,
        Json(json!({
            "status": label,
            "environment": state.environment,
            "database": database,
        })),
    )
}

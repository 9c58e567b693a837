use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use uuid::Uuid;

use cofound_matching::limits::{LIST_PAGE, page};
use cofound_types::api::{MarkAllReadResponse, MarkReadResponse, PageQuery, SendMessageRequest};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentUser;
use crate::run_blocking;
use crate::state::AppState;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let sent = run_blocking(move || Ok(mm.send_message(&user, req.match_id, &req.content, Utc::now())?)).await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

pub async fn get_conversations(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let window = page(query.skip, query.limit, LIST_PAGE)?;
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.get_conversations(&user, window)?)).await?;
    Ok(Json(found))
}

pub async fn get_messages(
    State(state): State<AppState>,
    WithRejection(Path(match_id), _): ApiPath<Uuid>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let window = page(query.skip, query.limit, LIST_PAGE)?;
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.get_messages(&user, match_id, window)?)).await?;
    Ok(Json(found))
}

pub async fn mark_read(
    State(state): State<AppState>,
    WithRejection(Path(message_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let msg = run_blocking(move || Ok(mm.mark_read(&user, message_id, Utc::now())?)).await?;
    Ok(Json(MarkReadResponse {
        message: "Message marked as read".to_string(),
        message_id: msg.id,
    }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    WithRejection(Path(match_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let marked = run_blocking(move || Ok(mm.mark_all_read(&user, match_id, Utc::now())?)).await?;
    Ok(Json(MarkAllReadResponse {
        message: format!("Marked {} messages as read", marked),
        match_id,
        marked,
    }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let counts = run_blocking(move || Ok(mm.unread_count(&user)?)).await?;
    Ok(Json(counts))
}

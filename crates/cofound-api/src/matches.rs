use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use uuid::Uuid;

use cofound_matching::limits::{BROWSE_PAGE, LIST_PAGE, page};
use cofound_types::api::{
    IntroRequest, IntroRequestedResponse, IntroRespondRequest, IntroRespondedResponse, InviteResponse,
    MatchListQuery, MatchStatusUpdate, PageQuery,
};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentUser;
use crate::run_blocking;
use crate::state::AppState;

pub async fn invite(
    State(state): State<AppState>,
    WithRejection(Path(target_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<IntroRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let outcome = run_blocking(move || Ok(mm.invite(&user, target_id, &req.message, Utc::now())?)).await?;

    let message = if outcome.auto_connected {
        "You're now connected! Check your inbox to start chatting."
    } else {
        "Invitation sent successfully"
    };
    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            message: message.to_string(),
            match_id: outcome.record.id,
            invites_remaining: outcome.invites_remaining,
            auto_connected: outcome.auto_connected,
        }),
    ))
}

pub async fn list_matches(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<MatchListQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let window = page(query.skip, query.limit, LIST_PAGE)?;
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.list_matches(&user, query.status_filter.as_deref(), window)?)).await?;
    Ok(Json(found))
}

pub async fn recommendations(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let window = page(query.skip, query.limit, BROWSE_PAGE)?;
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.recommendations(&user, window)?)).await?;
    Ok(Json(found))
}

pub async fn get_match(
    State(state): State<AppState>,
    WithRejection(Path(match_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.get_match(&user, match_id)?)).await?;
    Ok(Json(found))
}

pub async fn request_introduction(
    State(state): State<AppState>,
    WithRejection(Path(match_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<IntroRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let record =
        run_blocking(move || Ok(mm.request_introduction(&user, match_id, &req.message, Utc::now())?)).await?;

    Ok((
        StatusCode::CREATED,
        Json(IntroRequestedResponse {
            message: "Introduction request sent successfully".to_string(),
            match_id: record.id,
            intro_requested_at: record.intro_requested_at.unwrap_or(record.updated_at),
        }),
    ))
}

pub async fn respond_to_introduction(
    State(state): State<AppState>,
    WithRejection(Path(match_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<IntroRespondRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let accept = req.accept;
    let record = run_blocking(move || {
        Ok(mm.respond_to_introduction(&user, match_id, accept, req.message.as_deref(), Utc::now())?)
    })
    .await?;

    Ok(Json(IntroRespondedResponse {
        message: "Introduction request responded to successfully".to_string(),
        match_id: record.id,
        accepted: accept,
        status: record.status,
    }))
}

pub async fn update_status(
    State(state): State<AppState>,
    WithRejection(Path(match_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<MatchStatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let record = run_blocking(move || Ok(mm.update_status(&user, match_id, &req.status, Utc::now())?)).await?;
    Ok(Json(record))
}

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
use cofound_types::api::{PageQuery, ProfileActionResponse};

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::middleware::CurrentUser;
use crate::run_blocking;
use crate::state::AppState;

pub async fn discover(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let window = page(query.skip, query.limit, BROWSE_PAGE)?;
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.discover(&user, window)?)).await?;
    Ok(Json(found))
}

pub async fn save(
    State(state): State<AppState>,
    WithRejection(Path(target_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let record = run_blocking(move || Ok(mm.save_profile(&user, target_id, Utc::now())?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProfileActionResponse {
            message: "Profile saved".to_string(),
            match_id: record.id,
        }),
    ))
}

pub async fn skip(
    State(state): State<AppState>,
    WithRejection(Path(target_id), _): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let record = run_blocking(move || Ok(mm.skip_profile(&user, target_id, Utc::now())?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProfileActionResponse {
            message: "Profile skipped".to_string(),
            match_id: record.id,
        }),
    ))
}

pub async fn saved(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let window = page(query.skip, query.limit, LIST_PAGE)?;
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.saved_profiles(&user, window)?)).await?;
    Ok(Json(found))
}

pub async fn skipped(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let window = page(query.skip, query.limit, LIST_PAGE)?;
    let mm = state.matchmaker.clone();
    let found = run_blocking(move || Ok(mm.skipped_profiles(&user, window)?)).await?;
    Ok(Json(found))
}

pub async fn counts(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mm = state.matchmaker.clone();
    let counts = run_blocking(move || Ok(mm.profile_counts(&user)?)).await?;
    Ok(Json(counts))
}

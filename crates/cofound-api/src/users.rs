use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use cofound_db::rows::truncate_ts;
use cofound_db::users;
use cofound_types::api::{Claims, OnboardingRequest, ProfileUpdate};
use cofound_types::models::{RoleIntent, User, UserPublic};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::run_blocking;
use crate::state::AppState;

fn parse_role(raw: &str) -> Result<RoleIntent, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::InvalidInput("role_intent must be one of founder, cofounder, early_employee".into())
    })
}

/// Validate the request and build the new user for `external_id`.
fn new_user(external_id: String, req: OnboardingRequest) -> Result<User, ApiError> {
    req.validate()?;
    let role_intent = parse_role(&req.role_intent)?;

    Ok(User {
        id: Uuid::new_v4(),
        external_id,
        email: req.email,
        name: req.name,
        bio: req.bio,
        avatar_url: req.avatar_url,
        role_intent,
        location: req.location,
        experience_years: req.experience_years,
        previous_startups: req.previous_startups,
        is_active: true,
        is_banned: false,
        created_at: truncate_ts(Utc::now()),
    })
}

/// Apply the fields present in `update`; absent fields are left alone.
fn apply_update(mut user: User, update: ProfileUpdate) -> Result<User, ApiError> {
    if update.is_empty() {
        return Err(ApiError::InvalidInput("No fields to update".into()));
    }
    update.validate()?;

    if let Some(role) = update.role_intent.as_deref() {
        user.role_intent = parse_role(role)?;
    }
    if let Some(name) = update.name {
        user.name = name;
    }
    if let Some(bio) = update.bio {
        user.bio = Some(bio);
    }
    if let Some(avatar_url) = update.avatar_url {
        user.avatar_url = Some(avatar_url);
    }
    if let Some(location) = update.location {
        user.location = Some(location);
    }
    if let Some(years) = update.experience_years {
        user.experience_years = Some(years);
    }
    if let Some(count) = update.previous_startups {
        user.previous_startups = count;
    }
    Ok(user)
}

/// Create the caller's profile. Only needs a verified token.
pub async fn onboarding(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<OnboardingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = new_user(claims.sub, req)?;

    let mm = state.matchmaker.clone();
    let created = run_blocking(move || {
        mm.db().transaction(|conn| {
            if users::get_user_by_external_id(conn, &user.external_id)?.is_some() {
                return Err(ApiError::Conflict(
                    "User already exists. Use PUT /users/me to update profile.".into(),
                ));
            }
            if users::email_taken(conn, &user.email)? {
                return Err(ApiError::Conflict("Email already in use".into()));
            }
            users::insert_user(conn, &user)?;
            Ok(user)
        })
    })
    .await?;

    info!("Onboarded user {} ({})", created.id, created.role_intent);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(user)
}

/// Partial profile update for the caller.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    WithRejection(Json(update), _): ApiJson<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    let updated = apply_update(user, update)?;

    let mm = state.matchmaker.clone();
    let saved = run_blocking(move || {
        mm.db().transaction(|conn| {
            users::update_profile(conn, &updated)?;
            Ok::<_, ApiError>(updated)
        })
    })
    .await?;

    info!("Updated profile of user {}", saved.id);
    Ok(Json(saved))
}

/// Public profile of another user. Inactive and banned users are not found.
pub async fn get_profile(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): ApiPath<Uuid>,
) -> Result<Json<UserPublic>, ApiError> {
    let mm = state.matchmaker.clone();
    let user = run_blocking(move || {
        Ok(mm.db().with_conn(|conn| users::get_visible_user(conn, user_id))?)
    })
    .await?;

    user.map(|u| Json(u.public()))
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

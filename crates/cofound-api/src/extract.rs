//! Extractors whose rejections render as [`ApiError`] instead of axum's
//! plain-text bodies.

use axum::extract::{Path, Query};
use axum::Json;
use axum_extra::extract::WithRejection;

use crate::error::ApiError;

pub type ApiPath<T> = WithRejection<Path<T>, ApiError>;
pub type ApiQuery<T> = WithRejection<Query<T>, ApiError>;
pub type ApiJson<T> = WithRejection<Json<T>, ApiError>;

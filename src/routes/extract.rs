//! Maps axum's extractor rejections onto `AppError`, so malformed bodies,
//! query strings and path ids get the same JSON error body as everything else.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};

use crate::error::AppError;

pub fn json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(value)| value)
        .map_err(|err| AppError::Validation(err.body_text()))
}

pub fn query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(value)| value)
        .map_err(|err| AppError::Validation(err.body_text()))
}

pub fn path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    result
        .map(|Path(value)| value)
        .map_err(|err| AppError::Validation(err.body_text()))
}

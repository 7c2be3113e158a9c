use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::users::repo::RepoError;

/// Failures reported by the user service. Messages double as the public
/// error bodies, so their wording is part of the API.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid uuid format")]
    InvalidUuid,
    #[error("Invalid date format")]
    InvalidDate,
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Email already registered")]
    EmailRegistered,
    #[error("Could not find user")]
    NotFound,
    #[error("Storage unavailable")]
    Storage(#[source] RepoError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = match &self {
            UserError::InvalidUuid
            | UserError::InvalidDate
            | UserError::InvalidEmail
            | UserError::EmailRegistered => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Storage(err) => {
                error!(error = %err, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

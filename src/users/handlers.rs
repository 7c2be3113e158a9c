use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, instrument};

use crate::state::AppState;
use crate::users::dto::{CreateUserRequest, UserResponse};
use crate::users::error::UserError;

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), UserError> {
    let user = state.users.create(payload).await?;
    info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<UserResponse>, UserError> {
    let user = state.users.get(&uuid).await?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state, fields))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(fields): Json<HashMap<String, String>>,
) -> Result<Json<UserResponse>, UserError> {
    let user = state.users.update(&uuid, fields).await?;
    info!(user_id = %user.id, "user updated");
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, UserError> {
    state.users.delete(&uuid).await?;
    info!(user_id = %uuid, "user deleted");
    Ok(StatusCode::OK)
}

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use chirpy_db::UserChanges;
use chirpy_types::api::{CredentialsRequest, UpdateUserRequest};

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("email and password are required".into()));
    }

    let user = with_db(&state, move |db| db.create_user(&req.email, &req.password)).await?;

    info!(user_id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Change the caller's own email and/or password.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.filter(|e| !e.trim().is_empty());
    let password = req.password.filter(|p| !p.is_empty());
    if email.is_none() && password.is_none() {
        return Err(ApiError::BadRequest("nothing to update".into()));
    }

    let changes = UserChanges {
        email,
        password,
        is_privileged: None,
    };
    let user = with_db(&state, move |db| db.update_user(user_id, changes)).await?;

    Ok(Json(user))
}

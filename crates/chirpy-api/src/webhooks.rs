use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use chirpy_db::UserChanges;
use chirpy_types::events::WebhookEvent;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;

/// Payment provider callback. The key is checked by
/// [`require_api_key`](crate::middleware::require_api_key) before this runs.
pub async fn polka_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(user_id) = event.upgraded_user() else {
        return Ok(StatusCode::NO_CONTENT);
    };
    let user_id = user_id.ok_or_else(|| ApiError::NotFound("user id missing".into()))?;

    let changes = UserChanges {
        is_privileged: Some(true),
        ..Default::default()
    };
    with_db(&state, move |db| db.update_user(user_id, changes)).await?;

    info!(user_id, "user upgraded");
    Ok(StatusCode::NO_CONTENT)
}

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use chirpy_db::Database;
use chirpy_types::api::{
    ACCESS_ISSUER, CredentialsRequest, LoginResponse, REFRESH_ISSUER, TokenResponse,
};

use crate::error::ApiError;
use crate::middleware::{access_token_ttl, bearer_token, create_token, decode_token, refresh_token_ttl};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub polka_key: String,
    /// Requests served under `/app`.
    pub hits: AtomicUsize,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, polka_key: String) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret,
            polka_key,
            hits: AtomicUsize::new(0),
        })
    }
}

/// Run a blocking store call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> chirpy_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = with_db(&state, move |db| db.authenticate(&req.email, &req.password)).await?;

    let token = issue(&state, ACCESS_ISSUER, user.id)?;
    let refresh_token = issue(&state, REFRESH_ISSUER, user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse {
        user,
        token,
        refresh_token,
    }))
}

/// Trade a live refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)?.to_string();
    let claims = decode_token(&state.jwt_secret, &token, REFRESH_ISSUER)?;

    if with_db(&state, move |db| db.is_token_revoked(&token)).await? {
        return Err(ApiError::Unauthorized("refresh token has been revoked".into()));
    }

    let user_id: u64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized("invalid token subject".into()))?;
    let token = issue(&state, ACCESS_ISSUER, user_id)?;

    Ok(Json(TokenResponse { token }))
}

pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)?.to_string();
    let claims = decode_token(&state.jwt_secret, &token, REFRESH_ISSUER)?;

    with_db(&state, move |db| db.revoke_token(&token)).await?;

    info!(user = %claims.sub, "refresh token revoked");
    Ok(StatusCode::NO_CONTENT)
}

fn issue(state: &AppState, issuer: &str, user_id: u64) -> Result<String, ApiError> {
    let ttl = if issuer == REFRESH_ISSUER {
        refresh_token_ttl()
    } else {
        access_token_ttl()
    };
    create_token(&state.jwt_secret, issuer, user_id, ttl).map_err(|e| {
        error!("token creation failed: {}", e);
        ApiError::Internal
    })
}

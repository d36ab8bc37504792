use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;
use uuid::Uuid;

use chirpy_types::api::{ACCESS_ISSUER, Claims};

use crate::AppState;
use crate::error::ApiError;

const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;
const REFRESH_TOKEN_TTL_SECS: i64 = 60 * 24 * 60 * 60;

pub fn access_token_ttl() -> Duration {
    Duration::seconds(ACCESS_TOKEN_TTL_SECS)
}

pub fn refresh_token_ttl() -> Duration {
    Duration::seconds(REFRESH_TOKEN_TTL_SECS)
}

/// Id of the caller, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub u64);

/// Extract and validate an access token from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let claims = decode_token(&state.jwt_secret, token, ACCESS_ISSUER)?;
    let user_id: u64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized("invalid token subject".into()))?;

    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))
}

/// Reject payment webhooks that do not carry `Authorization: ApiKey <key>`.
/// Runs before the body is read.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.polka_key.is_empty() || api_key(req.headers()) != Some(state.polka_key.as_str()) {
        warn!("webhook rejected: bad api key");
        return Err(ApiError::Unauthorized("invalid api key".into()));
    }
    Ok(next.run(req).await)
}

pub fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("ApiKey "))
        .map(str::trim)
}

pub fn create_token(
    secret: &str,
    issuer: &str,
    user_id: u64,
    ttl: Duration,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        iss: issuer.to_string(),
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        jti: Uuid::new_v4(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Check signature, expiry and issuer.
pub fn decode_token(secret: &str, token: &str, issuer: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))
}

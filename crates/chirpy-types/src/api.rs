use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;

// -- JWT Claims --

/// Issuer of short-lived access tokens.
pub const ACCESS_ISSUER: &str = "chirpy-access";
/// Issuer of long-lived refresh tokens. Only these are ever revoked.
pub const REFRESH_ISSUER: &str = "chirpy-refresh";

/// JWT claims shared by the login, refresh and bearer-auth paths.
/// `sub` is the decimal user id; `jti` keeps two tokens minted in the same
/// second for the same user distinct in the revocation ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: Uuid,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Partial update of the caller's own account.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// -- Auth --

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    pub body: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

//! HTTP adapter over the chirpy store.

pub mod admin;
pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod users;
pub mod webhooks;

use std::path::Path;

use anyhow::bail;
use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

use crate::middleware::{require_api_key, require_auth};

/// All routes. Static files under `/app` are served from `static_dir`, which
/// must not contain the database file.
pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> anyhow::Result<Router> {
    let static_dir = static_dir.as_ref();
    ensure_not_served(static_dir, state.db.path())?;

    let public_routes = Router::new()
        .route("/api/healthz", get(admin::healthz))
        .route("/api/users", post(users::create_user))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route("/api/chirps", get(messages::list_messages))
        .route("/api/chirps/{chirp_id}", get(messages::get_message))
        .route("/admin/metrics", get(admin::metrics))
        .route("/admin/reset", post(admin::reset))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/users", put(users::update_user))
        .route("/api/chirps", post(messages::post_message))
        .route("/api/chirps/{chirp_id}", delete(messages::delete_message))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let webhook_routes = Router::new()
        .route("/api/polka/webhooks", post(webhooks::polka_webhook))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state.clone());

    let app_routes = Router::new()
        .nest_service("/app", ServeDir::new(static_dir))
        .layer(axum_middleware::from_fn_with_state(state, admin::count_hits));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(webhook_routes)
        .merge(app_routes))
}

/// Fail if the database file (or its `.tmp` sibling) would be reachable
/// under `/app`. A static dir that does not exist serves nothing.
fn ensure_not_served(static_dir: &Path, db_path: &Path) -> anyhow::Result<()> {
    let (Ok(static_dir), Ok(db_path)) = (static_dir.canonicalize(), db_path.canonicalize()) else {
        return Ok(());
    };
    if db_path.parent().is_some_and(|dir| dir.starts_with(&static_dir)) {
        bail!(
            "static dir {} contains the database {}",
            static_dir.display(),
            db_path.display()
        );
    }
    Ok(())
}

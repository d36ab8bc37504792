use std::net::SocketAddr;
use std::path::PathBuf;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use chirpy_api::AppStateInner;
use chirpy_db::Database;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirpy=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("CHIRPY_JWT_SECRET").unwrap_or_else(|_| {
        warn!("CHIRPY_JWT_SECRET not set, using the development secret");
        DEV_JWT_SECRET.into()
    });
    let polka_key = std::env::var("CHIRPY_POLKA_KEY").unwrap_or_default();
    if polka_key.is_empty() {
        warn!("CHIRPY_POLKA_KEY not set, webhooks will be rejected");
    }
    let db_path = PathBuf::from(
        std::env::var("CHIRPY_DB_PATH").unwrap_or_else(|_| "database.json".into()),
    );
    let static_dir = std::env::var("CHIRPY_STATIC_DIR").unwrap_or_else(|_| "static".into());
    let host = std::env::var("CHIRPY_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("CHIRPY_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;

    // --debug starts from an empty database
    if std::env::args().skip(1).any(|a| a == "--debug") {
        match std::fs::remove_file(&db_path) {
            Ok(()) => info!("Debug mode: removed {}", db_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    // Init database
    let db = Database::open(&db_path)?;
    info!("Database opened at {}", db_path.display());

    let state = AppStateInner::new(db, jwt_secret, polka_key);

    let app = chirpy_api::router(state, &static_dir)?
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Chirpy server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

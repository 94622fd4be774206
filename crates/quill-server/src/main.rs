use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_api::auth::{AppState, AppStateInner};
use quill_auth::SecurityContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let secret = std::env::var("QUILL_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("QUILL_DB_PATH").unwrap_or_else(|_| "quill.db".into());
    let host = std::env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("QUILL_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = quill_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state: the store plus the signing secret, fixed for the
    // process lifetime. Rotating the secret logs everyone out.
    let state: AppState = Arc::new(AppStateInner {
        db,
        security: SecurityContext::new(secret),
    });

    let app = quill_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Quill server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

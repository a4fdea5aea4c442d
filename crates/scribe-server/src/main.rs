use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use scribe_api::posts;
use scribe_api::state::AppStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("SCRIBE_DB_PATH").unwrap_or_else(|_| "scribe.db".into());
    let host = std::env::var("SCRIBE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SCRIBE_PORT")
        .unwrap_or_else(|_| "3838".into())
        .parse()?;

    // Init database
    let db = scribe_db::Database::open(&PathBuf::from(&db_path))?;
    let state = AppStateInner::new(db);

    let app = Router::new()
        .nest("/posts", posts::router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Scribe server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

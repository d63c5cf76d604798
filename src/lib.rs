pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod db;
pub mod jwt;
pub mod password;
pub mod uploads;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::TokenIssuer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secret for access tokens
    pub access_secret: Vec<u8>,
    /// Signing secret for refresh tokens (independent of the access secret)
    pub refresh_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
    /// Directory where uploaded profile images are stored
    pub uploads_dir: PathBuf,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let tokens = Arc::new(TokenIssuer::with_ttls(
        &config.access_secret,
        &config.refresh_secret,
        config.access_ttl_secs,
        config.refresh_ttl_secs,
    ));

    uploads::ensure_uploads_dir(&config.uploads_dir).expect("Failed to create uploads directory");

    let api_router = create_api_router(config.db.clone(), tokens, config.uploads_dir.clone());

    Router::new()
        .nest("/api", api_router)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}

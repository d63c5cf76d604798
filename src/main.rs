use clap::Parser;
use tracing::{error, info};
use userhub::cli::{
    Args, build_config, handle_create_admin, init_logging, load_secret, open_database,
};
use userhub::run_server;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) = load_secret(
        "ACCESS_TOKEN_SECRET",
        args.access_secret_file.as_deref(),
        "access-secret-file",
    ) else {
        std::process::exit(1);
    };

    let Some(refresh_secret) = load_secret(
        "REFRESH_TOKEN_SECRET",
        args.refresh_secret_file.as_deref(),
        "refresh-secret-file",
    ) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.create_admin.as_deref() {
        handle_create_admin(&db, email).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();

    let config = build_config(
        db,
        access_secret,
        refresh_secret,
        args.access_ttl_secs,
        args.refresh_ttl_secs,
        args.uploads_dir,
    );

    info!(address = %local_addr, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::{Router, routing::get};
use bookmarkd::bookmarks;
use bookmarkd::config::{Cli, Config, default_config_dir, default_config_path};
use bookmarkd::db::Database;
use bookmarkd::handler::{AppState, healthcheck};
use clap::Parser;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // If --config is provided, its parent directory holds the database.
    // Otherwise use ~/.bookmarkd/ for both
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("bookmarkd.svc starting");

    if let Err(e) = dotenv {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));
    if let Err(e) = db.sync().await {
        tracing::warn!(error = %e, "initial replica sync failed, serving local copy");
    }

    let address = format!("0.0.0.0:{}", cfg.app.get_port());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(healthcheck))
        .nest("/bookmarks", bookmarks::routes())
        .layer(DefaultBodyLimit::max(cfg.app.max_import_bytes))
        .layer(cors)
        .with_state(AppState { db });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("bookmarkd.svc running on {}", &address);
    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
        }
        tracing::info!("ctrl+c signal received, preparing to shutdown");
    });

    if let Err(err) = server.await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
    tracing::info!("bookmarkd.svc going off, graceful shutdown complete");
}

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use gamelist_server::config::ServerConfig;
use gamelist_server::rate_limit::spawn_rate_limit_sweeper;
use gamelist_server::store::GameStore;
use gamelist_server::{build_app_with_store, load_seed};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("GAMELIST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ServerConfig::load();
    config.validate();

    let store = match config.store.seed_path.as_deref() {
        Some(path) => match load_seed(path) {
            Ok(drafts) => {
                tracing::info!(count = drafts.len(), path, "Seeded game store");
                GameStore::seeded(drafts)
            },
            Err(e) => {
                tracing::error!("{e}");
                std::process::exit(1);
            },
        },
        None => GameStore::new(),
    };

    let listen_addr = config.listen_addr.clone();
    let (app, state) = build_app_with_store(config, store);
    spawn_rate_limit_sweeper(state);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {listen_addr}: {e}");
            std::process::exit(1);
        },
    };
    tracing::info!("gamelist server listening on {listen_addr}");

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
    })
    .await;

    if let Err(e) = result {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

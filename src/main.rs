use clap::Parser;

use demobank::{
    api::{self, AppState},
    config::{CliArgs, Config},
    storage, telemetry,
};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);

    telemetry::init_logging(&config.logging);

    let metrics = match telemetry::install_metrics() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            std::process::exit(1);
        }
    };

    let storage = match storage::open_storage(&config.storage) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open storage");
            std::process::exit(1);
        }
    };

    let addr = match config.listen_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, host = %config.server.host, "Invalid listen address");
            std::process::exit(1);
        }
    };

    if !config.auth.enabled {
        tracing::warn!("Authentication disabled; every request is treated as an administrator");
    }
    if config.otp.expose_code {
        tracing::warn!("Verification codes are returned in login responses");
    }

    let app = api::router(AppState::new(storage, &config, metrics));

    let server = match axum::Server::try_bind(&addr) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "API listening");

    if let Err(e) = server
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

use std::process::ExitCode;

use clap::Parser;
use marketdesk_web::telemetry::init_tracing;
use marketdesk_web::{app, AppState, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::parse();
    init_tracing();

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!(error = %error, "failed to open snapshot store");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(bind = %config.bind, error = %error, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        bind = %config.bind,
        store = ?config.store,
        quote_ttl_minutes = config.quote_ttl_minutes,
        fundamentals_ttl_minutes = config.fundamentals_ttl_minutes,
        market_data_ttl_minutes = config.market_data_ttl_minutes,
        "marketdesk server listening"
    );

    match axum::serve(listener, app(state)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "server stopped");
            ExitCode::FAILURE
        }
    }
}

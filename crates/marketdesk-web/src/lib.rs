//! HTTP surface for marketdesk: routes, error bodies, configuration, and logging setup.

pub mod config;
pub mod error;
pub mod handlers;
pub mod render;
pub mod state;
pub mod telemetry;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{ServerConfig, StoreKind};
pub use error::{ApiError, ApiResult};
pub use state::{AppState, CacheTtls};

use handlers::{alpha_vantage, fred, health, market_data};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/alpha-vantage/quote/:ticker", get(alpha_vantage::quote))
        .route("/api/alpha-vantage/overview/:ticker", get(alpha_vantage::overview))
        .route(
            "/api/alpha-vantage/income-statement/:ticker",
            get(alpha_vantage::income_statement),
        )
        .route(
            "/api/alpha-vantage/balance-sheet/:ticker",
            get(alpha_vantage::balance_sheet),
        )
        .route("/api/alpha-vantage/cash-flow/:ticker", get(alpha_vantage::cash_flow))
        .route("/api/alpha-vantage/market-data/spx", get(alpha_vantage::spx))
        .route("/api/alpha-vantage/search", get(alpha_vantage::search))
        .route("/api/market-data/:ticker", get(market_data::market_data))
        .route("/api/fred/10y-treasury", get(fred::ten_year_treasury))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

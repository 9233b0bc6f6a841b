use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use marketdesk_core::{Capability, FetchError, Outcome, ValidationError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid ticker")]
    InvalidTicker(#[source] ValidationError),

    #[error("Query parameter required")]
    MissingQuery,

    #[error("{}", fetch_message(.0))]
    Fetch(#[from] FetchError),

    #[error("{message}")]
    Internal {
        message: &'static str,
        details: Option<String>,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    classification: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidTicker(_) | Self::MissingQuery => StatusCode::BAD_REQUEST,
            Self::Fetch(error) => fetch_status(error),
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let error = self.to_string();
        match self {
            Self::InvalidTicker(reason) => ErrorBody {
                error,
                classification: Outcome::InvalidRequest,
                symbol: None,
                details: Some(reason.to_string()),
                note: None,
            },
            Self::MissingQuery => ErrorBody {
                error,
                classification: Outcome::InvalidRequest,
                symbol: None,
                details: None,
                note: None,
            },
            Self::Fetch(fetch) => ErrorBody {
                error,
                classification: fetch.outcome(),
                symbol: Some(fetch.subject().to_owned()),
                details: Some(fetch.detail()),
                note: fetch.note().map(str::to_owned),
            },
            Self::Internal { details, .. } => ErrorBody {
                error,
                classification: Outcome::TransientError,
                symbol: None,
                details: details.clone(),
                note: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

fn fetch_status(error: &FetchError) -> StatusCode {
    match error.outcome() {
        Outcome::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        Outcome::InvalidRequest | Outcome::Empty => StatusCode::NOT_FOUND,
        Outcome::PremiumRequired => StatusCode::BAD_GATEWAY,
        Outcome::TransientError => match error.upstream_status() {
            Some(status) if !(200..300).contains(&status) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        Outcome::Ok => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fetch_message(error: &FetchError) -> String {
    match error.outcome() {
        Outcome::RateLimit => String::from("API rate limit exceeded"),
        Outcome::PremiumRequired => String::from("Premium endpoint required"),
        Outcome::InvalidRequest | Outcome::Empty => String::from(not_found(error.capability())),
        Outcome::TransientError | Outcome::Ok => match error.capability() {
            Capability::MarketData => String::from("Failed to fetch market data from all sources"),
            Capability::SymbolSearch => String::from("Failed to search symbols"),
            capability => format!("Failed to fetch {}", capability.label()),
        },
    }
}

fn not_found(capability: Capability) -> &'static str {
    match capability {
        Capability::Quote => "Quote not found",
        Capability::Overview => "Symbol not found",
        Capability::IncomeStatement => "Income statement data not found",
        Capability::BalanceSheet => "Balance sheet data not found",
        Capability::CashFlow => "Cash flow data not found",
        Capability::MarketData => "Market data not found",
        Capability::TreasuryYield => "No treasury yield data available",
        Capability::SymbolSearch => "No matching symbols found",
    }
}

#[cfg(test)]
mod tests {
    use marketdesk_core::{Attempt, ProviderId};

    use super::*;

    fn failure(capability: Capability, outcome: Outcome, upstream_status: Option<u16>) -> ApiError {
        ApiError::Fetch(FetchError::new(
            "AAPL",
            capability,
            vec![Attempt {
                provider: ProviderId::Alphavantage,
                outcome,
                upstream_status,
                detail: String::from("detail"),
                note: None,
            }],
        ))
    }

    #[test]
    fn classifications_map_to_documented_statuses() {
        let cases = [
            (Outcome::RateLimit, Some(200), StatusCode::TOO_MANY_REQUESTS),
            (Outcome::InvalidRequest, Some(200), StatusCode::NOT_FOUND),
            (Outcome::Empty, Some(200), StatusCode::NOT_FOUND),
            (Outcome::PremiumRequired, Some(200), StatusCode::BAD_GATEWAY),
            (Outcome::TransientError, Some(503), StatusCode::BAD_GATEWAY),
            (Outcome::TransientError, None, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (outcome, upstream_status, expected) in cases {
            assert_eq!(
                failure(Capability::Quote, outcome, upstream_status).status(),
                expected,
                "{outcome}"
            );
        }
    }

    #[test]
    fn not_found_wording_follows_the_capability() {
        assert_eq!(
            failure(Capability::CashFlow, Outcome::Empty, Some(200)).to_string(),
            "Cash flow data not found"
        );
        assert_eq!(
            failure(Capability::MarketData, Outcome::TransientError, None).to_string(),
            "Failed to fetch market data from all sources"
        );
        assert_eq!(
            failure(Capability::IncomeStatement, Outcome::TransientError, None).to_string(),
            "Failed to fetch income statement"
        );
    }

    #[test]
    fn empty_chain_is_an_internal_failure() {
        let error = ApiError::Fetch(FetchError::new("AAPL", Capability::Quote, Vec::new()));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

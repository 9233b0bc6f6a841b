use thiserror::Error;

/// Input validation errors exposed by `marketdesk-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid provider '{value}', expected one of alphavantage, polygon, yahoo, fred")]
    InvalidProvider { value: String },
    #[error(
        "invalid capability '{value}', expected one of quote, overview, income_statement, \
         balance_sheet, cash_flow, market_data, treasury_yield, symbol_search"
    )]
    InvalidCapability { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Named kind of financial data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Quote,
    Overview,
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    MarketData,
    TreasuryYield,
    SymbolSearch,
}

impl Capability {
    pub const ALL: [Self; 8] = [
        Self::Quote,
        Self::Overview,
        Self::IncomeStatement,
        Self::BalanceSheet,
        Self::CashFlow,
        Self::MarketData,
        Self::TreasuryYield,
        Self::SymbolSearch,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Overview => "overview",
            Self::IncomeStatement => "income_statement",
            Self::BalanceSheet => "balance_sheet",
            Self::CashFlow => "cash_flow",
            Self::MarketData => "market_data",
            Self::TreasuryYield => "treasury_yield",
            Self::SymbolSearch => "symbol_search",
        }
    }

    /// Human wording used in outward error strings.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Overview => "company overview",
            Self::IncomeStatement => "income statement",
            Self::BalanceSheet => "balance sheet",
            Self::CashFlow => "cash flow",
            Self::MarketData => "market data",
            Self::TreasuryYield => "treasury yield",
            Self::SymbolSearch => "symbol search",
        }
    }

    pub const fn is_financial_statement(self) -> bool {
        matches!(
            self,
            Self::IncomeStatement | Self::BalanceSheet | Self::CashFlow
        )
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|capability| capability.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidCapability {
                value: value.trim().to_owned(),
            })
    }
}

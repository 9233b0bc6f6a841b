use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Normalized ticker as accepted on inbound paths and sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a ticker to uppercase.
    ///
    /// Index tickers such as `^GSPC` are accepted; everything else must start with a letter.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        let mut chars = normalized.chars();
        let body_start = match chars.next() {
            Some('^') => 1,
            Some(first) if first.is_ascii_alphabetic() => 0,
            Some(first) => return Err(ValidationError::SymbolInvalidStart { ch: first }),
            None => return Err(ValidationError::EmptySymbol),
        };

        for (index, ch) in normalized.chars().enumerate().skip(body_start) {
            let valid = ch.is_ascii_alphanumeric() || ch == '.' || ch == '-';
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        if body_start == 1 && len == 1 {
            return Err(ValidationError::EmptySymbol);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_ticker_is_uppercased() {
        let parsed = Symbol::parse(" aapl ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "AAPL");
    }

    #[test]
    fn share_class_and_index_tickers_are_accepted() {
        assert_eq!(Symbol::parse("brk.b").expect("valid").as_str(), "BRK.B");
        assert_eq!(Symbol::parse("^gspc").expect("valid").as_str(), "^GSPC");
    }

    #[test]
    fn rejects_blank_and_bare_caret() {
        assert_eq!(Symbol::parse("   "), Err(ValidationError::EmptySymbol));
        assert_eq!(Symbol::parse("^"), Err(ValidationError::EmptySymbol));
    }

    #[test]
    fn rejects_invalid_start() {
        let err = Symbol::parse("1AAPL").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidStart { ch: '1' }));
    }

    #[test]
    fn rejects_path_and_query_characters() {
        let err = Symbol::parse("AAPL&apikey=x").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: '&', index: 4 }));
    }

    #[test]
    fn rejects_overlong_ticker() {
        let err = Symbol::parse("ABCDEFGHIJKLMNOP").expect_err("must fail");
        assert_eq!(err, ValidationError::SymbolTooLong { len: 16, max: 15 });
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 10;
const MIN_CURRENCY_LEN: usize = 2;
const MAX_CURRENCY_LEN: usize = 10;

/// Normalized cryptocurrency ticker (`BTC`, `ETH`, `1INCH`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol to uppercase.
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

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '-';
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    /// Parse symbols given either as separate items or as comma-joined text.
    ///
    /// `["btc", "eth"]` and `["btc, eth"]` both normalize to `[BTC, ETH]`.
    /// Every comma-separated piece must be a valid symbol.
    pub fn parse_list<I, S>(items: I) -> Result<Vec<Self>, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols = Vec::new();
        for item in items {
            for piece in item.as_ref().split(',') {
                symbols.push(Self::parse(piece)?);
            }
        }

        if symbols.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(symbols)
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

/// Conversion currency for quoted prices (`USD`, `EUR`, `BTC`, `USDT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let len = normalized.len();
        let is_valid = (MIN_CURRENCY_LEN..=MAX_CURRENCY_LEN).contains(&len)
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());

        if !is_valid {
            return Err(ValidationError::InvalidCurrency {
                value: input.to_owned(),
            });
        }

        Ok(Self(normalized))
    }

    pub fn usd() -> Self {
        Self(String::from("USD"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" btc ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "BTC");
    }

    #[test]
    fn accepts_leading_digits() {
        let parsed = Symbol::parse("1inch").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "1INCH");
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = Symbol::parse("BTC$").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: '$', index: 3 }));
    }

    #[test]
    fn rejects_overlong_symbol() {
        let err = Symbol::parse("ABCDEFGHIJK").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolTooLong { len: 11, max: 10 }));
    }

    #[test]
    fn comma_joined_and_array_forms_normalize_identically() {
        let joined = Symbol::parse_list(["btc, eth"]).expect("joined list");
        let array = Symbol::parse_list(["BTC", " eth "]).expect("array list");

        assert_eq!(joined, array);
        assert_eq!(
            joined.iter().map(Symbol::as_str).collect::<Vec<_>>(),
            vec!["BTC", "ETH"]
        );
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = Symbol::parse_list(Vec::<String>::new()).expect_err("must fail");
        assert_eq!(err, ValidationError::EmptySelection);
    }

    #[test]
    fn currency_is_uppercased_and_bounded() {
        assert_eq!(Currency::parse("usdt").expect("valid").as_str(), "USDT");
        assert!(Currency::parse("U").is_err());
        assert!(Currency::parse("US DOLLAR").is_err());
    }
}

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Not a valid amount: '{0}'")]
    Invalid(String),
    #[error("Amount must not be negative: '{0}'")]
    Negative(String),
}

/// A rupee amount, kept at paise precision. Serializes as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    /// Parse an amount as printed on a payment screen, e.g. `1,250.00` or `500`.
    /// Comma group separators are ignored.
    ///
    /// `Decimal` holds at most 28 significant digits; longer digit runs are
    /// reported as `Invalid`.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let clean: String = s.chars().filter(|c| *c != ',').collect();
        let dec = Decimal::from_str(clean.trim())
            .map_err(|_| MoneyError::Invalid(s.to_string()))?;
        if dec.is_sign_negative() && !dec.is_zero() {
            return Err(MoneyError::Negative(s.to_string()));
        }
        Ok(Money::from_decimal(dec))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    /// Lossy conversion for pre-filling numeric form inputs.
    pub fn to_f64(self) -> Option<f64> {
        self.0.to_f64()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_and_grouped() {
        assert_eq!(Money::parse("500").unwrap().to_f64(), Some(500.0));
        assert_eq!(Money::parse("1,250.00").unwrap().to_f64(), Some(1250.0));
        assert_eq!(Money::parse("1,00,000.5").unwrap().to_f64(), Some(100000.5));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Money::parse("abc"), Err(MoneyError::Invalid("abc".into())));
        assert!(Money::parse("").is_err());
        assert!(Money::parse(",").is_err());
    }

    #[test]
    fn parse_rejects_negative() {
        assert_eq!(Money::parse("-5"), Err(MoneyError::Negative("-5".into())));
    }

    #[test]
    fn parse_rejects_digit_runs_beyond_decimal_range() {
        let s = "123456789012345678901234567890";
        assert_eq!(Money::parse(s), Err(MoneyError::Invalid(s.into())));
    }

    #[test]
    fn parse_rounds_to_paise() {
        assert_eq!(Money::parse("12.345").unwrap(), Money::parse("12.34").unwrap());
    }

    #[test]
    fn equality_ignores_trailing_zeros() {
        assert_eq!(Money::parse("1250.00").unwrap(), Money::parse("1250").unwrap());
    }

    #[test]
    fn display_uses_rupee_sign() {
        assert_eq!(Money::parse("1250").unwrap().to_string(), "₹1250.00");
        assert_eq!(Money::parse("0.5").unwrap().to_string(), "₹0.50");
    }

    #[test]
    fn serializes_as_json_number() {
        let json = serde_json::to_value(Money::parse("1,250.00").unwrap()).unwrap();
        assert!(json.is_number());
        assert_eq!(json.as_f64(), Some(1250.0));
        let json = serde_json::to_value(Money::parse("500").unwrap()).unwrap();
        assert_eq!(json.as_f64(), Some(500.0));
    }

    #[test]
    fn deserializes_from_json_number() {
        let m: Money = serde_json::from_str("99.5").unwrap();
        assert_eq!(m, Money::parse("99.50").unwrap());
    }
}

//! Money types with precise decimal arithmetic
//!
//! Claimed amounts, coverage limits and recommended payouts are carried as
//! `Money` so that self-pay ratios and limit caps never go through floats.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    CNY,
    HKD,
    USD,
    EUR,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::CNY => "¥",
            Currency::HKD => "HK$",
            Currency::USD => "$",
            Currency::EUR => "€",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::CNY => "CNY",
            Currency::HKD => "HKD",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }

    /// Resolves a currency from a symbol found in document text
    ///
    /// `￥` (full-width) and `¥` both map to CNY.
    pub fn from_symbol(symbol: &str) -> Option<Currency> {
        match symbol {
            "¥" | "￥" => Some(Currency::CNY),
            "HK$" => Some(Currency::HKD),
            "$" => Some(Currency::USD),
            "€" => Some(Currency::EUR),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// A monetary amount with associated currency
///
/// Amounts are stored with 4 decimal places internally and rounded to the
/// currency's minor unit on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Creates Money from a plain decimal string such as `"5000.00"`
    pub fn parse(amount: &str, currency: Currency) -> Result<Self, MoneyError> {
        let cleaned = amount.replace(',', "");
        cleaned
            .trim()
            .parse::<Decimal>()
            .map(|d| Self::new(d, currency))
            .map_err(|_| MoneyError::InvalidAmount(amount.to_string()))
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Rounds to the currency's standard decimal places
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp(self.currency.decimal_places()),
            currency: self.currency,
        }
    }

    /// Returns the smaller of two amounts in the same currency
    pub fn checked_min(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(if other.amount < self.amount { *other } else { *self })
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{}{:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

/// A ratio such as a self-pay share (e.g., 0.10 for 10%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a decimal value (e.g., 0.1 for 10%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g., 10 for 10%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    /// Returns `1 - rate`, the share left after applying this rate
    pub fn complement(&self) -> Rate {
        Rate::new(dec!(1) - self.value)
    }

    /// Applies this rate to a money amount
    pub fn apply(&self, money: &Money) -> Money {
        Money::new(money.amount() * self.value, money.currency())
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", (self.value * dec!(100)).round_dp(4).normalize())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn min_never_exceeds_either_operand(
            a in 0i64..10_000_000i64,
            b in 0i64..10_000_000i64
        ) {
            let ma = Money::new(Decimal::new(a, 2), Currency::CNY);
            let mb = Money::new(Decimal::new(b, 2), Currency::CNY);
            let min = ma.checked_min(&mb).unwrap();
            prop_assert!(min.amount() <= ma.amount());
            prop_assert!(min.amount() <= mb.amount());
        }

        #[test]
        fn complement_plus_rate_is_whole(pct in 0u32..=100u32) {
            let rate = Rate::from_percentage(Decimal::from(pct));
            let amount = Money::new(dec!(1000), Currency::CNY);
            let total = rate.apply(&amount).amount() + rate.complement().apply(&amount).amount();
            prop_assert_eq!(total, dec!(1000));
        }
    }
}

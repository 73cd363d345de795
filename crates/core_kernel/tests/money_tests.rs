//! Tests for the Money module
//!
//! Covers creation, parsing of amounts read from claim documents, currency
//! handling and the rate helpers used by payout calculation.

use core_kernel::{Money, Currency, MoneyError, Rate};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::CNY);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::CNY);
        assert!(m.is_zero());
    }

    #[test]
    fn test_default_currency_is_cny() {
        assert_eq!(Currency::default(), Currency::CNY);
    }
}

mod parsing {
    use super::*;

    #[test]
    fn test_parse_plain_amount() {
        let m = Money::parse("5000.00", Currency::CNY).unwrap();
        assert_eq!(m.amount(), dec!(5000));
        assert!(!m.is_zero());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let m = Money::parse("  88.8 ", Currency::CNY).unwrap();
        assert_eq!(m.amount(), dec!(88.8));
    }

    #[test]
    fn test_parse_invalid_amount() {
        let err = Money::parse("五千", Currency::CNY).unwrap_err();
        assert_eq!(err, MoneyError::InvalidAmount("五千".to_string()));
    }
}

mod currency {
    use super::*;

    #[test]
    fn test_symbols_resolve_to_currency() {
        assert_eq!(Currency::from_symbol("¥"), Some(Currency::CNY));
        assert_eq!(Currency::from_symbol("￥"), Some(Currency::CNY));
        assert_eq!(Currency::from_symbol("$"), Some(Currency::USD));
        assert_eq!(Currency::from_symbol("元"), None);
    }

    #[test]
    fn test_currency_serializes_uppercase() {
        let json = serde_json::to_string(&Currency::CNY).unwrap();
        assert_eq!(json, "\"CNY\"");
    }

    #[test]
    fn test_display_rounds_to_minor_units() {
        let m = Money::new(dec!(4500.005), Currency::CNY).round_to_currency();
        assert_eq!(m.to_string(), "¥4500.00");
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_min_picks_smaller_amount() {
        let invoice = Money::new(dec!(4500), Currency::CNY);
        let cap = Money::new(dec!(30000), Currency::CNY);
        assert_eq!(invoice.checked_min(&cap).unwrap(), invoice);
    }

    #[test]
    fn test_min_rejects_mismatched_currency() {
        let a = Money::new(dec!(100), Currency::CNY);
        let b = Money::new(dec!(100), Currency::HKD);
        assert!(matches!(a.checked_min(&b), Err(MoneyError::CurrencyMismatch(_, _))));
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_rate_display() {
        let rate = Rate::new(dec!(0.1));
        assert_eq!(rate.to_string(), "10%");
    }

    #[test]
    fn test_rate_from_percentage() {
        let rate = Rate::from_percentage(dec!(10));
        assert_eq!(rate, Rate::new(dec!(0.1)));
        assert_eq!(rate.to_string(), "10%");
    }
}

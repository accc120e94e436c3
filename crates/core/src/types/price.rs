//! Decimal prices and currency display.
//!
//! Amounts are always `rust_decimal::Decimal`; the commerce API sends them as
//! strings and they are never round-tripped through floating point.

use core::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display, e.g. `1,250,000 IRR` or `$19.99`.
    #[must_use]
    pub fn display(&self) -> String {
        self.currency_code.format(self.amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes the storefront can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Iranian rial (the store's default currency).
    #[default]
    IRR,
    USD,
    EUR,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::IRR => "IRR",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }

    /// Number of fraction digits shown.
    #[must_use]
    pub const fn fraction_digits(self) -> u32 {
        match self {
            Self::IRR => 0,
            Self::USD | Self::EUR => 2,
        }
    }

    /// Format an amount with grouped thousands in this currency.
    #[must_use]
    pub fn format(self, amount: Decimal) -> String {
        let digits = self.fraction_digits();
        let rounded = amount.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let plain = format!("{:.*}", digits as usize, rounded.abs());
        let (int_part, frac_part) = plain
            .split_once('.')
            .map_or((plain.as_str(), None), |(i, f)| (i, Some(f)));

        let mut grouped = group_thousands(int_part);
        if let Some(frac) = frac_part {
            grouped.push('.');
            grouped.push_str(frac);
        }

        let sign = if negative { "-" } else { "" };
        match self {
            Self::IRR => format!("{sign}{grouped} IRR"),
            Self::USD => format!("{sign}${grouped}"),
            Self::EUR => format!("{sign}€{grouped}"),
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IRR" => Ok(Self::IRR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Percentage saved between a regular and a sale price, rounded to the
/// nearest whole percent. Zero when there is no saving.
#[must_use]
pub fn discount_percentage(regular: Decimal, sale: Decimal) -> u32 {
    if regular <= Decimal::ZERO || sale <= Decimal::ZERO || regular <= sale {
        return 0;
    }
    let pct = ((regular - sale) / regular * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    pct.to_u32().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_format_rial_without_fraction() {
        let amount = Decimal::new(1_250_000, 0);
        assert_eq!(CurrencyCode::IRR.format(amount), "1,250,000 IRR");
    }

    #[test]
    fn test_format_rial_rounds() {
        assert_eq!(CurrencyCode::IRR.format(Decimal::new(9995, 1)), "1,000 IRR");
    }

    #[test]
    fn test_format_usd_two_places() {
        assert_eq!(CurrencyCode::USD.format(Decimal::new(123_456, 2)), "$1,234.56");
        assert_eq!(CurrencyCode::USD.format(Decimal::new(5, 0)), "$5.00");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(CurrencyCode::EUR.format(Decimal::new(-1050, 2)), "-€10.50");
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(Decimal::new(999, 0), CurrencyCode::IRR);
        assert_eq!(price.to_string(), "999 IRR");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("usd".parse::<CurrencyCode>(), Ok(CurrencyCode::USD));
        assert!("JPY".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_discount_percentage() {
        assert_eq!(discount_percentage(Decimal::new(200, 0), Decimal::new(150, 0)), 25);
        assert_eq!(discount_percentage(Decimal::new(3, 0), Decimal::new(2, 0)), 33);
        assert_eq!(discount_percentage(Decimal::new(100, 0), Decimal::new(100, 0)), 0);
        assert_eq!(discount_percentage(Decimal::ZERO, Decimal::new(1, 0)), 0);
    }
}

//! Money and currency types

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency codes (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    CNY,
    HKD,
    SGD,
    KRW,
}

impl Currency {
    /// Get currency code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::JPY => "JPY",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::CHF => "CHF",
            Self::CNY => "CNY",
            Self::HKD => "HKD",
            Self::SGD => "SGD",
            Self::KRW => "KRW",
        }
    }

    /// Get decimal places (0 for zero-decimal currencies)
    pub fn decimals(&self) -> u32 {
        match self {
            Self::JPY | Self::KRW => 0,
            _ => 2,
        }
    }

    /// Multiplier from major to minor unit
    pub fn minor_unit_factor(&self) -> u64 {
        10u64.pow(self.decimals())
    }

    /// Is a zero-decimal currency
    pub fn is_zero_decimal(&self) -> bool {
        self.decimals() == 0
    }

    /// Parse from string
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            "GBP" => Some(Self::GBP),
            "JPY" => Some(Self::JPY),
            "CAD" => Some(Self::CAD),
            "AUD" => Some(Self::AUD),
            "CHF" => Some(Self::CHF),
            "CNY" => Some(Self::CNY),
            "HKD" => Some(Self::HKD),
            "SGD" => Some(Self::SGD),
            "KRW" => Some(Self::KRW),
            _ => None,
        }
    }

    /// Parse a caller-supplied code, rejecting unknown currencies.
    pub fn parse(code: &str) -> GatewayResult<Self> {
        Self::from_code(code)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("unsupported currency: {code:?}")))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Money amount with currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit (cents, pence, yen)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create a new money amount from smallest unit
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Scale a major-unit amount into minor units.
    pub fn from_major(amount: u64, currency: Currency) -> GatewayResult<Self> {
        amount
            .checked_mul(currency.minor_unit_factor())
            .and_then(|minor| i64::try_from(minor).ok())
            .map(|minor| Self::new(minor, currency))
            .ok_or_else(|| {
                GatewayError::InvalidRequest(format!("amount {amount} {currency} is out of range"))
            })
    }

    /// Format for display
    pub fn format(&self) -> String {
        let factor = self.currency.minor_unit_factor() as i64;
        if factor == 1 {
            return format!("{} {}", self.amount, self.currency);
        }
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        format!(
            "{}{}.{:0width$} {}",
            sign,
            abs / factor as u64,
            abs % factor as u64,
            self.currency,
            width = self.currency.decimals() as usize
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

//! Fixed-point amounts
//!
//! Every balance, supply counter and reference value is an [`Amount`]: an
//! unsigned count of minor units with 8 decimal places. Arithmetic is checked;
//! nothing in the ledger ever wraps or goes below zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor units per whole token (8 decimal places)
pub const TOKEN_UNIT: u64 = 100_000_000;

/// Decimal places carried by an [`Amount`]
pub const DECIMALS: usize = 8;

const BASIS_POINTS: u128 = 10_000;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount '{input}': {reason}")]
pub struct ParseAmountError {
    pub input: String,
    pub reason: &'static str,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(u64::MAX);

    pub const fn from_minor(minor: u64) -> Self {
        Amount(minor)
    }

    /// Whole tokens, saturating at [`Amount::MAX`]
    pub const fn from_tokens(tokens: u64) -> Self {
        Amount(tokens.saturating_mul(TOKEN_UNIT))
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Rounds a decimal quantity to the nearest minor unit. Negative and
    /// non-finite inputs have no representation.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let minor = (value * TOKEN_UNIT as f64).round();
        if minor > u64::MAX as f64 {
            return None;
        }
        Some(Amount(minor as u64))
    }

    /// Floors a quantity already expressed in minor units
    pub fn from_minor_f64_floor(minor: f64) -> Option<Self> {
        if !minor.is_finite() || minor < 0.0 || minor > u64::MAX as f64 {
            return None;
        }
        Some(Amount(minor.floor() as u64))
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / TOKEN_UNIT as f64
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_mul(self, factor: u64) -> Option<Amount> {
        self.0.checked_mul(factor).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// `self * percent / 100`, floored to a minor unit. The percentage is
    /// resolved to whole basis points first so the result is deterministic.
    pub fn percent(self, percent: f64) -> Amount {
        let bps = percent_to_bps(percent);
        Amount(((self.0 as u128 * bps) / BASIS_POINTS) as u64)
    }

    /// `self * TOKEN_UNIT / divisor` in 128-bit space, floored
    pub fn checked_div_amount(self, divisor: Amount) -> Option<Amount> {
        if divisor.is_zero() {
            return None;
        }
        let scaled = (self.0 as u128 * TOKEN_UNIT as u128) / divisor.0 as u128;
        u64::try_from(scaled).ok().map(Amount)
    }

    /// `self * factor / TOKEN_UNIT` in 128-bit space, floored
    pub fn checked_mul_amount(self, factor: Amount) -> Option<Amount> {
        let scaled = (self.0 as u128 * factor.0 as u128) / TOKEN_UNIT as u128;
        u64::try_from(scaled).ok().map(Amount)
    }

    pub fn clamp_to(self, min: Amount, max: Amount) -> Amount {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }
}

fn percent_to_bps(percent: f64) -> u128 {
    if !percent.is_finite() || percent <= 0.0 {
        return 0;
    }
    (percent * 100.0).round().min(BASIS_POINTS as f64) as u128
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / TOKEN_UNIT,
            self.0 % TOKEN_UNIT,
            width = DECIMALS
        )
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseAmountError {
            input: s.to_string(),
            reason,
        };
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(err("empty"));
        }
        if trimmed.starts_with('-') {
            return Err(err("negative"));
        }

        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err("no digits"));
        }
        if frac.len() > DECIMALS {
            return Err(err("more than 8 decimal places"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err("not a decimal number"));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err("out of range"))?
        };
        let frac_minor: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<width$}", frac, width = DECIMALS)
                .parse()
                .map_err(|_| err("out of range"))?
        };

        whole
            .checked_mul(TOKEN_UNIT)
            .and_then(|m| m.checked_add(frac_minor))
            .map(Amount)
            .ok_or_else(|| err("out of range"))
    }
}

/// Serde adapter for human-edited files: reads `"12.5"`, `12.5` or `12` as a
/// token quantity and writes a decimal string.
pub mod as_decimal {
    use super::Amount;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
        Float(f64),
    }

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(de::Error::custom),
            Raw::Int(tokens) => tokens
                .checked_mul(super::TOKEN_UNIT)
                .map(Amount::from_minor)
                .ok_or_else(|| de::Error::custom("amount out of range")),
            Raw::Float(value) => Amount::from_f64(value)
                .ok_or_else(|| de::Error::custom(format!("invalid amount {}", value))),
        }
    }
}

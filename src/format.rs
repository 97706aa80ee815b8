//! Mixed-radix price display
//!
//! Auction prices arrive as a single integer in the lower denomination. For
//! display they are split into whole higher units plus a remainder using the
//! live exchange rate, the same way seconds split into minutes and seconds.

use crate::{
    constants::{HIGHER_UNIT, LOWER_UNIT, REMAINDER_THRESHOLD},
    types::ExchangeRate,
};

/// An amount split into higher units and a lower-unit remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixedAmount {
    pub whole: u64,
    pub remainder: u64,
}

impl MixedAmount {
    /// Splits `raw_amount` at the given rate
    pub fn split(rate: ExchangeRate, raw_amount: u64) -> Self {
        let units = rate.units();
        Self {
            whole: raw_amount / units,
            remainder: raw_amount % units,
        }
    }

    /// Inverse of [`MixedAmount::split`]
    pub fn to_raw(&self, rate: ExchangeRate) -> u64 {
        self.whole * rate.units() + self.remainder
    }
}

/// Renders amounts using two unit labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFormatter {
    higher_unit: String,
    lower_unit: String,
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self::new(HIGHER_UNIT, LOWER_UNIT)
    }
}

impl PriceFormatter {
    pub fn new(higher_unit: impl Into<String>, lower_unit: impl Into<String>) -> Self {
        Self {
            higher_unit: higher_unit.into(),
            lower_unit: lower_unit.into(),
        }
    }

    /// Formats `raw_amount` lower units for display
    ///
    /// - at least one higher unit and a remainder above the threshold: both units
    /// - at least one higher unit otherwise: higher unit only
    /// - no whole higher unit: remainder only
    pub fn format(&self, rate: ExchangeRate, raw_amount: u64) -> String {
        let amount = MixedAmount::split(rate, raw_amount);
        match amount {
            MixedAmount { whole: 0, remainder } => format!("{} {}", remainder, self.lower_unit),
            MixedAmount { whole, remainder } if remainder > REMAINDER_THRESHOLD => format!(
                "{} {} {} {}",
                whole, self.higher_unit, remainder, self.lower_unit
            ),
            MixedAmount { whole, .. } => format!("{} {}", whole, self.higher_unit),
        }
    }
}

/// Formats with the default unit labels
pub fn format_price(rate: ExchangeRate, raw_amount: u64) -> String {
    PriceFormatter::default().format(rate, raw_amount)
}

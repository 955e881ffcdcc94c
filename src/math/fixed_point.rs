//! Fixed-point scales and truncating wide arithmetic.
//!
//! Every quantity class carries one scale: 18-decimal values (prices, annual
//! rates, performance-fee rates), 27-decimal per-second rates, and basis
//! points. The newtypes below keep them apart; crossing scales goes through
//! [`rescale`].

use ethnum::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FeeError;

/// 1.0 in 18-decimal fixed point.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// 1.0 in 27-decimal fixed point.
pub const RATE_SCALE: u128 = 1_000_000_000_000_000_000_000_000_000;

/// 100% in basis points.
pub const BPS_SCALE: u128 = 10_000;

/// No leap-year adjustment.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Fixed-point denominators used by the fee engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// 10^18.
    Unit,
    /// 10^27.
    Rate,
    /// 10^4.
    Bps,
}

impl Scale {
    pub const fn factor(self) -> u128 {
        match self {
            Scale::Unit => UNIT,
            Scale::Rate => RATE_SCALE,
            Scale::Bps => BPS_SCALE,
        }
    }
}

/// Unsigned 18-decimal fixed-point value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UFixed18(pub u128);

/// Unsigned 27-decimal fixed-point value (scaled per-second rates).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UFixed27(pub u128);

/// Basis points out of [`BPS_SCALE`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Bps(pub u128);

impl UFixed18 {
    pub const ZERO: UFixed18 = UFixed18(0);
    pub const ONE: UFixed18 = UFixed18(UNIT);

    pub fn raw(self) -> u128 {
        self.0
    }
}

impl UFixed27 {
    pub const ONE: UFixed27 = UFixed27(RATE_SCALE);

    pub fn raw(self) -> u128 {
        self.0
    }
}

impl Bps {
    pub fn raw(self) -> u128 {
        self.0
    }
}

impl fmt::Display for UFixed18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UFixed27 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `floor(a * b / denominator)` with a 256-bit intermediate.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, FeeError> {
    if denominator == 0 {
        return Err(FeeError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(denominator))
}

/// `ceil(a * b / denominator)` with a 256-bit intermediate.
pub fn mul_div_up(a: u128, b: u128, denominator: u128) -> Result<u128, FeeError> {
    if denominator == 0 {
        return Err(FeeError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;
    if product % denominator != U256::ZERO {
        quotient += U256::ONE;
    }
    narrow(quotient)
}

/// Moves a raw value from one scale to another, truncating when shrinking.
pub fn rescale(value: u128, from: Scale, to: Scale) -> Result<u128, FeeError> {
    mul_div(value, to.factor(), from.factor())
}

/// Narrows a 256-bit intermediate back to `u128`.
pub fn narrow(value: U256) -> Result<u128, FeeError> {
    if value > U256::from(u128::MAX) {
        return Err(FeeError::Overflow);
    }
    Ok(value.as_u128())
}

/// Signed difference `a - b` for two unsigned amounts.
pub fn signed_sub(a: u128, b: u128) -> Result<i128, FeeError> {
    if a >= b {
        i128::try_from(a - b).map_err(|_| FeeError::Overflow)
    } else {
        i128::try_from(b - a)
            .map(|magnitude| -magnitude)
            .map_err(|_| FeeError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div(2, 1, 3).unwrap(), 0);
        assert_eq!(mul_div_up(10, 10, 3).unwrap(), 34);
        assert_eq!(mul_div_up(9, 1, 3).unwrap(), 3);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // u128::MAX * UNIT overflows 128 bits but the quotient fits.
        assert_eq!(mul_div(u128::MAX, UNIT, UNIT).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul_div_overflow_is_error() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(FeeError::Overflow));
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), Err(FeeError::DivisionByZero));
    }

    #[test]
    fn test_rescale_between_scales() {
        assert_eq!(rescale(UNIT, Scale::Unit, Scale::Rate).unwrap(), RATE_SCALE);
        assert_eq!(
            rescale(RATE_SCALE + 999_999_999, Scale::Rate, Scale::Unit).unwrap(),
            UNIT
        );
        assert_eq!(rescale(UNIT / 100, Scale::Unit, Scale::Bps).unwrap(), 100);
    }

    #[test]
    fn test_signed_sub() {
        assert_eq!(signed_sub(5, 3).unwrap(), 2);
        assert_eq!(signed_sub(3, 5).unwrap(), -2);
        assert_eq!(signed_sub(u128::MAX, 0), Err(FeeError::Overflow));
    }

    #[test]
    fn test_seconds_per_year() {
        assert_eq!(SECONDS_PER_YEAR, 31_536_000);
    }
}

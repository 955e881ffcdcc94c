//! Human-readable decimals backed by rust_decimal.
//!
//! Used at the edges only: parsing `"0.02"`-style rates and rendering
//! fixed-point prices. Fee math itself never touches these values.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use thiserror::Error;

use crate::math::fixed_point::{Bps, UFixed18, UFixed27};

const UNIT_DECIMALS: u32 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityParseError {
    #[error("not a number: {0}")]
    Invalid(String),
    #[error("negative value: {0}")]
    Negative(String),
    #[error("value does not fit fixed point: {0}")]
    OutOfRange(String),
}

/// Lossless decimal used to parse human rates and render fixed-point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal(RustDecimal);

impl Decimal {
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Canonical string without trailing zeros or exponent notation.
    pub fn to_canonical_string(&self) -> String {
        self.0.normalize().to_string()
    }

    pub fn is_negative(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_negative()
    }

    /// Interprets a raw fixed-point integer with `decimals` places.
    pub fn from_fixed(raw: u128, decimals: u32) -> Result<Self, QuantityParseError> {
        let signed = i128::try_from(raw).map_err(|_| QuantityParseError::OutOfRange(raw.to_string()))?;
        RustDecimal::try_from_i128_with_scale(signed, decimals)
            .map(Decimal)
            .map_err(|_| QuantityParseError::OutOfRange(raw.to_string()))
    }

    /// Scales to a raw fixed-point integer with `decimals` places, truncating.
    pub fn to_fixed(&self, decimals: u32) -> Result<u128, QuantityParseError> {
        if self.is_negative() {
            return Err(QuantityParseError::Negative(self.to_canonical_string()));
        }
        let factor = RustDecimal::from_i128_with_scale(10i128.pow(decimals), 0);
        self.0
            .checked_mul(factor)
            .and_then(|scaled| scaled.trunc().to_u128())
            .ok_or_else(|| QuantityParseError::OutOfRange(self.to_canonical_string()))
    }

    pub fn from_ufixed18(value: UFixed18) -> Result<Self, QuantityParseError> {
        Self::from_fixed(value.raw(), UNIT_DECIMALS)
    }
}

/// Parses an unsigned integer amount (shares, GAV) given as a decimal string.
pub fn parse_amount(s: &str) -> Result<u128, QuantityParseError> {
    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        return Err(QuantityParseError::Negative(s.to_string()));
    }
    trimmed
        .parse::<u128>()
        .map_err(|_| QuantityParseError::Invalid(s.to_string()))
}

/// Parses an 18-decimal rate: `"0.02"` is a fraction, `"20000000000000000"`
/// is already raw fixed point.
pub fn parse_ufixed18(s: &str) -> Result<UFixed18, QuantityParseError> {
    let trimmed = s.trim();
    if trimmed.contains('.') {
        let decimal = Decimal::from_str_canonical(trimmed)
            .map_err(|_| QuantityParseError::Invalid(s.to_string()))?;
        return decimal.to_fixed(UNIT_DECIMALS).map(UFixed18);
    }
    parse_amount(trimmed).map(UFixed18)
}

/// Parses a raw 27-decimal per-second rate.
pub fn parse_ufixed27(s: &str) -> Result<UFixed27, QuantityParseError> {
    parse_amount(s).map(UFixed27)
}

/// Parses a basis-point rate (`"50"` = 0.5%).
pub fn parse_bps(s: &str) -> Result<Bps, QuantityParseError> {
    parse_amount(s).map(Bps)
}

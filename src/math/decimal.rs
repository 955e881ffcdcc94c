//! Significant-digit decimal arithmetic with an explicit precision context.
//!
//! Values are `bigdecimal::BigDecimal`. Every public operation on
//! [`DecimalContext`] rounds its result to the context's precision;
//! transcendental functions and integer powers run at a few guard digits
//! above it and round once at the end. No state is shared between contexts,
//! so two funds computing with different precisions never observe each other.

use bigdecimal::{BigDecimal, RoundingMode};
use std::num::NonZeroU64;
use std::str::FromStr;

use crate::error::FeeError;

/// Largest precision a caller may request.
pub const MAX_PRECISION: u32 = 27;

/// Significant digits required by the fee protocol.
pub const MANAGEMENT_FEE_DIGITS: u32 = 27;

const GUARD_DIGITS: u32 = 9;

const MAX_SERIES_TERMS: u32 = 500;

/// Rounding applied when digits are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// Toward zero (floor for non-negative values).
    Down,
    /// Away from zero (ceiling for non-negative values).
    Up,
    /// To nearest, ties away from zero.
    HalfUp,
}

impl Rounding {
    fn mode(self) -> RoundingMode {
        match self {
            Rounding::Down => RoundingMode::Down,
            Rounding::Up => RoundingMode::Up,
            Rounding::HalfUp => RoundingMode::HalfUp,
        }
    }
}

/// Exact decimal for a raw integer amount.
pub fn from_integer(value: u128) -> Result<BigDecimal, FeeError> {
    BigDecimal::from_str(&value.to_string()).map_err(|_| FeeError::Overflow)
}

/// `value * 10^decimals` as an integer, discarding the fraction with
/// `rounding`. Negative or oversized results are `Overflow`.
pub fn to_scaled_integer(
    value: &BigDecimal,
    decimals: i64,
    rounding: Rounding,
) -> Result<u128, FeeError> {
    let (digits, _) = value
        .with_scale_round(decimals, rounding.mode())
        .into_bigint_and_exponent();
    digits.to_string().parse::<u128>().map_err(|_| FeeError::Overflow)
}

fn zero() -> BigDecimal {
    BigDecimal::from(0u64)
}

fn one() -> BigDecimal {
    BigDecimal::from(1u64)
}

fn pow10(power: u32) -> BigDecimal {
    BigDecimal::new(1u64.into(), -i64::from(power))
}

/// Precision and rounding for a chain of decimal operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalContext {
    precision: u32,
    rounding: Rounding,
}

impl DecimalContext {
    /// Context with `precision` significant digits, rounding half-up.
    pub fn new(precision: u32) -> Result<Self, FeeError> {
        if precision == 0 || precision > MAX_PRECISION {
            return Err(FeeError::PrecisionOutOfRange {
                got: precision,
                max: MAX_PRECISION,
            });
        }
        Ok(Self {
            precision,
            rounding: Rounding::HalfUp,
        })
    }

    /// The protocol context: 27 significant digits, half-up.
    pub fn management_fee() -> Self {
        Self {
            precision: MANAGEMENT_FEE_DIGITS,
            rounding: Rounding::HalfUp,
        }
    }

    pub fn with_rounding(self, rounding: Rounding) -> Self {
        Self { rounding, ..self }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    fn working(&self) -> Self {
        Self {
            precision: self.precision + GUARD_DIGITS,
            rounding: Rounding::HalfUp,
        }
    }

    pub fn round(&self, value: BigDecimal) -> Result<BigDecimal, FeeError> {
        let digits = NonZeroU64::new(u64::from(self.precision)).ok_or(
            FeeError::PrecisionOutOfRange {
                got: self.precision,
                max: MAX_PRECISION,
            },
        )?;
        Ok(value.with_precision_round(digits, self.rounding.mode()))
    }

    pub fn add(&self, a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, FeeError> {
        self.round(a + b)
    }

    /// `a - b`; a negative result is an error.
    pub fn sub(&self, a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, FeeError> {
        let difference = a - b;
        if difference < zero() {
            return Err(FeeError::Overflow);
        }
        self.round(difference)
    }

    pub fn mul(&self, a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, FeeError> {
        self.round(a * b)
    }

    pub fn div(&self, a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, FeeError> {
        if *b == zero() {
            return Err(FeeError::DivisionByZero);
        }
        self.round(a / b)
    }

    /// `base^exponent` by repeated squaring. Intermediate products keep the
    /// guard digits; only the final value is rounded to this context.
    pub fn powi(&self, base: &BigDecimal, exponent: u64) -> Result<BigDecimal, FeeError> {
        if exponent == 0 || *base == one() {
            return Ok(one());
        }
        if *base == zero() {
            return Ok(zero());
        }
        let working = self.working();
        let mut result = one();
        let mut square = working.round(base.clone())?;
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = working.mul(&result, &square)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                square = working.mul(&square, &square)?;
            }
        }
        self.round(result)
    }

    /// Natural logarithm, defined here for `value >= 1`.
    pub fn ln(&self, value: &BigDecimal) -> Result<BigDecimal, FeeError> {
        let working = self.working();
        self.round(ln_unrounded(&working, value)?)
    }

    /// `e^value` for `value >= 0`.
    pub fn exp(&self, value: &BigDecimal) -> Result<BigDecimal, FeeError> {
        let working = self.working();
        self.round(exp_unrounded(&working, value)?)
    }

    /// `value^(1/degree)` computed as `exp(ln(value) / degree)`.
    pub fn root(&self, value: &BigDecimal, degree: u64) -> Result<BigDecimal, FeeError> {
        if degree == 0 {
            return Err(FeeError::DivisionByZero);
        }
        let working = self.working();
        let log = ln_unrounded(&working, value)?;
        let scaled = working.div(&log, &BigDecimal::from(degree))?;
        self.round(exp_unrounded(&working, &scaled)?)
    }
}

impl Default for DecimalContext {
    fn default() -> Self {
        Self::management_fee()
    }
}

fn ln_unrounded(working: &DecimalContext, value: &BigDecimal) -> Result<BigDecimal, FeeError> {
    if *value < one() {
        return Err(FeeError::RateOutOfRange(format!(
            "logarithm argument {} is below one",
            value
        )));
    }
    let two = BigDecimal::from(2u64);
    let mut reduced = working.round(value.clone())?;
    let mut halvings = 0u64;
    while reduced > two {
        reduced = working.div(&reduced, &two)?;
        halvings += 1;
    }
    let ratio = working.div(&(&reduced - &one()), &(&reduced + &one()))?;
    let mut log = working.mul(&atanh_series(working, &ratio)?, &two)?;
    if halvings > 0 {
        // ln 2 = 2 * atanh(1/3)
        let third = working.div(&one(), &BigDecimal::from(3u64))?;
        let ln2 = working.mul(&atanh_series(working, &third)?, &two)?;
        log = working.add(&log, &working.mul(&ln2, &BigDecimal::from(halvings))?)?;
    }
    Ok(log)
}

fn atanh_series(working: &DecimalContext, z: &BigDecimal) -> Result<BigDecimal, FeeError> {
    if *z == zero() {
        return Ok(zero());
    }
    let z_squared = working.mul(z, z)?;
    let mut sum = z.clone();
    let mut power = z.clone();
    for k in 1..MAX_SERIES_TERMS {
        power = working.mul(&power, &z_squared)?;
        let term = working.div(&power, &BigDecimal::from(u64::from(2 * k + 1)))?;
        if negligible(working, &term, &sum) {
            break;
        }
        sum = working.add(&sum, &term)?;
    }
    Ok(sum)
}

fn exp_unrounded(working: &DecimalContext, value: &BigDecimal) -> Result<BigDecimal, FeeError> {
    if *value == zero() {
        return Ok(one());
    }
    let two = BigDecimal::from(2u64);
    let mut reduced = working.round(value.clone())?;
    let mut halvings = 0u32;
    while reduced >= one() {
        reduced = working.div(&reduced, &two)?;
        halvings += 1;
    }
    let mut sum = one();
    let mut term = one();
    for k in 1..MAX_SERIES_TERMS {
        term = working.div(&working.mul(&term, &reduced)?, &BigDecimal::from(u64::from(k)))?;
        if negligible(working, &term, &sum) {
            break;
        }
        sum = working.add(&sum, &term)?;
    }
    for _ in 0..halvings {
        sum = working.mul(&sum, &sum)?;
    }
    Ok(sum)
}

/// A term is negligible once it sits more than `precision + 1` decimal
/// places below the running sum.
fn negligible(working: &DecimalContext, term: &BigDecimal, sum: &BigDecimal) -> bool {
    *term == zero() || term * &pow10(working.precision + 1) < *sum
}

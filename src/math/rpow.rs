//! Compound accrual of a scaled per-second rate.

use crate::error::FeeError;
use crate::math::decimal::{from_integer, to_scaled_integer, DecimalContext, Rounding};

/// `floor((x / b)^n * b)` evaluated in `ctx`.
///
/// `x` is a rate scaled by `b`; `n` is a count of elapsed seconds. The base
/// is rounded to the context precision, the power is taken with guard digits
/// and rounded once, and the scaled result is floored.
pub fn rpow(ctx: &DecimalContext, x: u128, n: u64, b: u128) -> Result<u128, FeeError> {
    if b == 0 {
        return Err(FeeError::DivisionByZero);
    }
    if n == 0 || x == b {
        return Ok(b);
    }
    let scale = from_integer(b)?;
    let base = ctx.div(&from_integer(x)?, &scale)?;
    let grown = ctx.powi(&base, n)?;
    let scaled = ctx.mul(&grown, &scale)?;
    to_scaled_integer(&scaled, 0, Rounding::Down)
}

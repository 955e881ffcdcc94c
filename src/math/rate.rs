//! Conversion between annual fee rates and scaled per-second rates.
//!
//! An annual rate `r` is quoted as a fraction of post-fee value, so it is
//! first turned into the effective rate `r / (1 - r)` charged on pre-fee
//! value. The per-second factor is `(1 + r')^(1 / SECONDS_PER_YEAR)`.

use crate::error::FeeError;
use bigdecimal::BigDecimal;

use crate::math::decimal::{from_integer, to_scaled_integer, DecimalContext, Rounding};
use crate::math::fixed_point::{UFixed18, UFixed27, RATE_SCALE, SECONDS_PER_YEAR, UNIT};

const UNIT_DECIMALS: i64 = 18;
const RATE_DECIMALS: i64 = 27;

/// Annual 18-decimal rate to a 27-decimal per-second compounding factor.
///
/// # Errors
/// `RateOutOfRange` for rates of 100% or more.
pub fn to_scaled_per_second_rate(
    ctx: &DecimalContext,
    annual_rate: UFixed18,
) -> Result<UFixed27, FeeError> {
    if annual_rate.raw() >= UNIT {
        return Err(FeeError::RateOutOfRange(format!(
            "annual rate {} must be below {}",
            annual_rate, UNIT
        )));
    }
    let one = BigDecimal::from(1u64);
    let rate = ctx.div(&from_integer(annual_rate.raw())?, &from_integer(UNIT)?)?;
    let effective = ctx.div(&rate, &ctx.sub(&one, &rate)?)?;
    let factor = ctx.root(&ctx.add(&one, &effective)?, SECONDS_PER_YEAR)?;
    Ok(UFixed27(to_scaled_integer(&factor, RATE_DECIMALS, Rounding::HalfUp)?))
}

/// Inverse of [`to_scaled_per_second_rate`], rounding the final 18-decimal
/// value up so a round trip never under-charges.
///
/// # Errors
/// `RateOutOfRange` for per-second factors below one.
pub fn from_scaled_per_second_rate(
    ctx: &DecimalContext,
    scaled_per_second_rate: UFixed27,
) -> Result<UFixed18, FeeError> {
    if scaled_per_second_rate.raw() < RATE_SCALE {
        return Err(FeeError::RateOutOfRange(format!(
            "scaled per-second rate {} is below {}",
            scaled_per_second_rate, RATE_SCALE
        )));
    }
    let one = BigDecimal::from(1u64);
    let per_second = ctx.div(
        &from_integer(scaled_per_second_rate.raw())?,
        &from_integer(RATE_SCALE)?,
    )?;
    let effective = ctx.sub(&ctx.powi(&per_second, SECONDS_PER_YEAR)?, &one)?;
    let rate = ctx.div(&effective, &ctx.add(&one, &effective)?)?;
    Ok(UFixed18(to_scaled_integer(&rate, UNIT_DECIMALS, Rounding::Up)?))
}

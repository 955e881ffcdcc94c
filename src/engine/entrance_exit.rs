//! Per-trade entrance and exit fees.

use crate::error::FeeError;
use crate::math::fixed_point::{mul_div, Bps, UFixed18, BPS_SCALE, UNIT};

/// Entrance fee, in shares, carved out of `shares_bought` gross shares.
///
/// `shares_bought * rate / (UNIT + rate)`: the investor keeps
/// `shares_bought - fee`, so fee and net shares add back to the gross amount.
pub fn entrance_fee_shares_due(rate: UFixed18, shares_bought: u128) -> Result<u128, FeeError> {
    let denominator = UNIT.checked_add(rate.raw()).ok_or(FeeError::Overflow)?;
    mul_div(shares_bought, rate.raw(), denominator)
}

/// Exit fee, in shares, taken from `shares_redeemed` at a basis-point rate.
///
/// The shares are already leaving the supply, so no inflation correction
/// applies.
pub fn exit_fee_shares_due(rate: Bps, shares_redeemed: u128) -> Result<u128, FeeError> {
    if rate.raw() > BPS_SCALE {
        return Err(FeeError::RateOutOfRange(format!(
            "exit fee of {} bps exceeds 100%",
            rate
        )));
    }
    mul_div(shares_redeemed, rate.raw(), BPS_SCALE)
}

/// Shares left to the investor after an entrance fee.
pub fn net_shares_after_entrance_fee(rate: UFixed18, shares_bought: u128) -> Result<u128, FeeError> {
    let fee = entrance_fee_shares_due(rate, shares_bought)?;
    Ok(shares_bought - fee)
}

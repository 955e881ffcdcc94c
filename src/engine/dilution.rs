//! Dilution-correct minting.

use crate::error::FeeError;
use crate::math::fixed_point::mul_div;

/// Shares to mint so the recipient's post-mint stake is worth `raw_shares_due`
/// shares at the pre-mint price.
///
/// Minting `raw` shares into `supply` only gives the recipient
/// `raw / (supply + raw)` of the fund; minting
/// `raw * supply / (supply - raw)` gives exactly `raw / supply`.
///
/// # Errors
/// `DilutionPrecondition` when `raw_shares_due >= shares_supply` (outside the
/// single-share guards), which means the valuation feeding the fee is broken.
pub fn shares_due_with_inflation(raw_shares_due: u128, shares_supply: u128) -> Result<u128, FeeError> {
    if raw_shares_due == 0 {
        return Ok(0);
    }
    if raw_shares_due == 1 || shares_supply == 1 {
        return Ok(1);
    }
    if raw_shares_due >= shares_supply {
        return Err(FeeError::DilutionPrecondition {
            raw_shares_due,
            shares_supply,
        });
    }
    mul_div(raw_shares_due, shares_supply, shares_supply - raw_shares_due)
}

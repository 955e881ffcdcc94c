//! High-water-mark performance fee.
//!
//! Value created above the high-water mark accrues into an aggregate claim
//! that is re-expressed in shares at every settlement. Shares already minted
//! for that claim ("outstanding") are excluded from the net supply used to
//! price the fund, and the returned share delta may be negative when the
//! claim shrinks.

use serde::{Deserialize, Serialize};

use super::dilution::shares_due_with_inflation;
use super::hook::FeeHook;
use crate::error::FeeError;
use crate::math::fixed_point::{mul_div, signed_sub, UFixed18, UNIT};

/// Persisted performance-fee state for one fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceFeeState {
    pub high_water_mark: UFixed18,
    pub last_share_price: UFixed18,
    pub aggregate_value_due: u128,
}

impl PerformanceFeeState {
    /// State at activation: both marks at the initial share price.
    pub fn new(initial_share_price: UFixed18) -> Self {
        Self {
            high_water_mark: initial_share_price,
            last_share_price: initial_share_price,
            aggregate_value_due: 0,
        }
    }
}

/// Fund figures read at settlement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundValuation {
    pub total_shares_supply: u128,
    /// Shares already minted for the unrealized claim.
    pub shares_outstanding: u128,
    pub gav: u128,
}

impl FundValuation {
    pub fn net_shares_supply(&self) -> Result<u128, FeeError> {
        self.total_shares_supply
            .checked_sub(self.shares_outstanding)
            .ok_or(FeeError::Overflow)
    }
}

/// Outcome of one performance-fee settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceFeeSettlement {
    /// Positive: mint to the recipient. Negative: burn back.
    pub shares_due: i128,
    /// Outstanding shares once `shares_due` is applied.
    pub settled_shares: u128,
    /// Share price excluding performance-fee shares.
    pub share_price: UFixed18,
    pub next_share_price: UFixed18,
    pub state: PerformanceFeeState,
}

/// A configured performance fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceFee {
    rate: UFixed18,
}

impl PerformanceFee {
    /// # Errors
    /// `RateOutOfRange` above 100%.
    pub fn new(rate: UFixed18) -> Result<Self, FeeError> {
        if rate.raw() > UNIT {
            return Err(FeeError::RateOutOfRange(format!(
                "performance fee rate {} exceeds {}",
                rate, UNIT
            )));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> UFixed18 {
        self.rate
    }

    /// Settles accrued performance since the previous call.
    ///
    /// # Errors
    /// `DilutionPrecondition` when the claim is worth the whole fund,
    /// `NonPositiveNextSupply` when a pending redemption would empty it,
    /// `Overflow` when outstanding shares exceed the total supply.
    pub fn settle(
        &self,
        state: &PerformanceFeeState,
        valuation: &FundValuation,
        hook: FeeHook,
    ) -> Result<PerformanceFeeSettlement, FeeError> {
        let net_supply = valuation.net_shares_supply()?;
        let gav = valuation.gav;
        let share_price = gross_share_price(gav, net_supply)?;

        let high_water_mark = state.high_water_mark.max(share_price);
        let previous_mark = state.high_water_mark.max(state.last_share_price);

        // Both factors truncate toward zero, so the sign is carried apart.
        let gained = high_water_mark >= previous_mark;
        let price_move = high_water_mark.raw().abs_diff(previous_mark.raw());
        let value_moved = mul_div(price_move, net_supply, UNIT)?;
        let accrued = mul_div(value_moved, self.rate.raw(), UNIT)?;

        let aggregate_value_due = if gained {
            state
                .aggregate_value_due
                .checked_add(accrued)
                .ok_or(FeeError::Overflow)?
        } else {
            state.aggregate_value_due.saturating_sub(accrued)
        };

        let raw_shares_due = if gav == 0 {
            0
        } else {
            mul_div(aggregate_value_due, net_supply, gav)?
        };
        let settled_shares = shares_due_with_inflation(raw_shares_due, net_supply)?;
        let shares_due = signed_sub(settled_shares, valuation.shares_outstanding)?;

        let next_share_price = next_share_price(hook, share_price, gav, net_supply)?;

        Ok(PerformanceFeeSettlement {
            shares_due,
            settled_shares,
            share_price,
            next_share_price,
            state: PerformanceFeeState {
                high_water_mark,
                last_share_price: next_share_price,
                aggregate_value_due,
            },
        })
    }
}

/// `gav * UNIT / net_supply`; an empty fund prices at one unit.
pub fn gross_share_price(gav: u128, net_supply: u128) -> Result<UFixed18, FeeError> {
    if net_supply == 0 {
        return Ok(UFixed18::ONE);
    }
    Ok(UFixed18(mul_div(gav, UNIT, net_supply)?))
}

/// Share price once the hook's pending trade has gone through.
fn next_share_price(
    hook: FeeHook,
    share_price: UFixed18,
    gav: u128,
    net_supply: u128,
) -> Result<UFixed18, FeeError> {
    match hook {
        FeeHook::Continuous | FeeHook::PostBuyShares => Ok(share_price),
        FeeHook::PreBuyShares { investment_amount } => {
            let issue_price = if share_price.raw() == 0 {
                UNIT
            } else {
                share_price.raw()
            };
            let shares_issued = mul_div(investment_amount, UNIT, issue_price)?;
            let next_gav = gav
                .checked_add(investment_amount)
                .ok_or(FeeError::Overflow)?;
            let next_supply = net_supply
                .checked_add(shares_issued)
                .ok_or(FeeError::Overflow)?;
            if next_supply == 0 {
                return Err(FeeError::NonPositiveNextSupply(0));
            }
            Ok(UFixed18(mul_div(next_gav, UNIT, next_supply)?))
        }
        FeeHook::PreRedeemShares { shares_redeemed } => {
            if shares_redeemed >= net_supply {
                return Err(FeeError::NonPositiveNextSupply(signed_sub(
                    net_supply,
                    shares_redeemed,
                )?));
            }
            let gav_released = mul_div(shares_redeemed, gav, net_supply)?;
            let next_gav = gav - gav_released;
            let next_supply = net_supply - shares_redeemed;
            Ok(UFixed18(mul_div(next_gav, UNIT, next_supply)?))
        }
    }
}

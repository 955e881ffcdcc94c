//! Continuous per-second management fee.

use serde::{Deserialize, Serialize};

use crate::error::FeeError;
use crate::math::decimal::DecimalContext;
use crate::math::fixed_point::{mul_div, UFixed18, UFixed27, RATE_SCALE};
use crate::math::rate::to_scaled_per_second_rate;
use crate::math::rpow::rpow;

/// Persisted management-fee state for one fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementFeeState {
    pub last_settled_timestamp: u64,
}

impl ManagementFeeState {
    pub fn new(activated_at: u64) -> Self {
        Self {
            last_settled_timestamp: activated_at,
        }
    }
}

/// Outcome of one management-fee settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagementFeeSettlement {
    pub shares_due: u128,
    pub state: ManagementFeeState,
}

/// A configured management fee. The per-second rate is derived once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementFee {
    scaled_per_second_rate: UFixed27,
}

impl ManagementFee {
    /// # Errors
    /// `RateOutOfRange` for a factor below one (a negative rate).
    pub fn new(scaled_per_second_rate: UFixed27) -> Result<Self, FeeError> {
        if scaled_per_second_rate.raw() < RATE_SCALE {
            return Err(FeeError::RateOutOfRange(format!(
                "scaled per-second rate {} is below {}",
                scaled_per_second_rate, RATE_SCALE
            )));
        }
        Ok(Self {
            scaled_per_second_rate,
        })
    }

    pub fn from_annual_rate(ctx: &DecimalContext, annual_rate: UFixed18) -> Result<Self, FeeError> {
        Self::new(to_scaled_per_second_rate(ctx, annual_rate)?)
    }

    pub fn scaled_per_second_rate(&self) -> UFixed27 {
        self.scaled_per_second_rate
    }

    /// Accrues shares since `state.last_settled_timestamp` and advances it to
    /// `now`. Settling twice at the same instant yields zero the second time.
    ///
    /// # Errors
    /// `ClockRegression` when `now` precedes the last settlement.
    pub fn settle(
        &self,
        ctx: &DecimalContext,
        state: ManagementFeeState,
        shares_supply: u128,
        now: u64,
    ) -> Result<ManagementFeeSettlement, FeeError> {
        self.settle_in_steps(ctx, state, shares_supply, now, u64::MAX)
    }

    /// [`settle`](Self::settle) with the elapsed time compounded in steps of
    /// at most `max_step` seconds.
    pub fn settle_in_steps(
        &self,
        ctx: &DecimalContext,
        state: ManagementFeeState,
        shares_supply: u128,
        now: u64,
        max_step: u64,
    ) -> Result<ManagementFeeSettlement, FeeError> {
        let elapsed = now
            .checked_sub(state.last_settled_timestamp)
            .ok_or(FeeError::ClockRegression {
                last: state.last_settled_timestamp,
                now,
            })?;
        let shares_due = management_fee_shares_due_in_steps(
            ctx,
            self.scaled_per_second_rate,
            shares_supply,
            elapsed,
            max_step,
        )?;
        Ok(ManagementFeeSettlement {
            shares_due,
            state: ManagementFeeState::new(now),
        })
    }
}

/// `shares_supply * (rpow(rate, elapsed) - RATE_SCALE) / RATE_SCALE`, floored.
pub fn management_fee_shares_due(
    ctx: &DecimalContext,
    scaled_per_second_rate: UFixed27,
    shares_supply: u128,
    seconds_since_last_settled: u64,
) -> Result<u128, FeeError> {
    management_fee_shares_due_in_steps(
        ctx,
        scaled_per_second_rate,
        shares_supply,
        seconds_since_last_settled,
        u64::MAX,
    )
}

/// [`management_fee_shares_due`] with growth compounded in steps of at most
/// `max_step` seconds, so a long gap costs a few `rpow` calls instead of
/// being refused.
pub fn management_fee_shares_due_in_steps(
    ctx: &DecimalContext,
    scaled_per_second_rate: UFixed27,
    shares_supply: u128,
    seconds_since_last_settled: u64,
    max_step: u64,
) -> Result<u128, FeeError> {
    if seconds_since_last_settled == 0 || shares_supply == 0 {
        return Ok(0);
    }
    let growth = compounded_growth(
        ctx,
        scaled_per_second_rate.raw(),
        seconds_since_last_settled,
        max_step,
    )?;
    let accrued = growth.checked_sub(RATE_SCALE).ok_or_else(|| {
        FeeError::RateOutOfRange(format!(
            "scaled per-second rate {} is below {}",
            scaled_per_second_rate, RATE_SCALE
        ))
    })?;
    mul_div(shares_supply, accrued, RATE_SCALE)
}

/// `rpow(rate, elapsed)` as `rpow(rpow(rate, step), elapsed / step)` times
/// `rpow(rate, elapsed % step)`.
fn compounded_growth(
    ctx: &DecimalContext,
    rate: u128,
    elapsed: u64,
    max_step: u64,
) -> Result<u128, FeeError> {
    let step = max_step.max(1);
    if elapsed <= step {
        return rpow(ctx, rate, elapsed, RATE_SCALE);
    }
    let per_step = rpow(ctx, rate, step, RATE_SCALE)?;
    let whole = rpow(ctx, per_step, elapsed / step, RATE_SCALE)?;
    let tail = rpow(ctx, rate, elapsed % step, RATE_SCALE)?;
    mul_div(whole, tail, RATE_SCALE)
}

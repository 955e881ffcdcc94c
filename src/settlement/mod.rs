//! Stateful settlement on top of the pure fee engine.
//!
//! The engine is not safe to run twice concurrently for the same fee state:
//! every settlement is a read-modify-write of one record. [`Settler`] holds a
//! per-(fund, fee) async lock across the whole load-compute-store cycle, so
//! calls for one key run strictly in sequence while different funds proceed
//! in parallel.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{FeeKind, FundId, UnixSeconds};
use crate::engine::{
    FeeHook, FeeHookKind, FundValuation, ManagementFee, ManagementFeeState, PerformanceFee,
    PerformanceFeeSettlement, PerformanceFeeState,
};
use crate::error::FeeError;
use crate::math::decimal::DecimalContext;
use crate::math::fixed_point::{UFixed18, UFixed27};

pub mod memory;

pub use memory::MemoryFeeStore;

/// An active management fee and its settlement state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementFeeRecord {
    pub fund: FundId,
    pub annual_rate: UFixed18,
    pub fee: ManagementFee,
    pub state: ManagementFeeState,
}

/// An active performance fee, its state, and the shares minted for it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceFeeRecord {
    pub fund: FundId,
    pub fee: PerformanceFee,
    pub state: PerformanceFeeState,
    pub shares_outstanding: u128,
}

/// One line of the settlement audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRecord {
    pub fund: FundId,
    pub kind: FeeKind,
    pub hook: Option<FeeHookKind>,
    pub shares_due: i128,
    pub settled_at: UnixSeconds,
}

/// Current fee states for a fund.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FundFees {
    pub management: Option<ManagementFeeRecord>,
    pub performance: Option<PerformanceFeeRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagementOutcome {
    pub shares_due: u128,
    pub state: ManagementFeeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceOutcome {
    pub settlement: PerformanceFeeSettlement,
    pub shares_outstanding: u128,
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Fee(#[from] FeeError),
    #[error("{kind} fee is not active for fund {fund}")]
    NotActive { fund: FundId, kind: FeeKind },
    #[error("{kind} fee is already active for fund {fund}")]
    AlreadyActive { fund: FundId, kind: FeeKind },
    #[error("Store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for SettlementError {
    fn from(err: sqlx::Error) -> Self {
        SettlementError::Store(err.to_string())
    }
}

/// Persistence for fee states and the settlement log.
///
/// `commit_*` methods must apply the state update and the log append
/// atomically.
#[async_trait]
pub trait FeeStore: Send + Sync + fmt::Debug {
    async fn load_management_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<ManagementFeeRecord>, SettlementError>;

    /// Returns `false` when the fund already has a management fee.
    async fn insert_management_fee(
        &self,
        record: &ManagementFeeRecord,
    ) -> Result<bool, SettlementError>;

    async fn commit_management_settlement(
        &self,
        fund: &FundId,
        state: &ManagementFeeState,
        log: &SettlementRecord,
    ) -> Result<(), SettlementError>;

    async fn load_performance_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<PerformanceFeeRecord>, SettlementError>;

    /// Returns `false` when the fund already has a performance fee.
    async fn insert_performance_fee(
        &self,
        record: &PerformanceFeeRecord,
    ) -> Result<bool, SettlementError>;

    async fn commit_performance_settlement(
        &self,
        fund: &FundId,
        state: &PerformanceFeeState,
        shares_outstanding: u128,
        log: &SettlementRecord,
    ) -> Result<(), SettlementError>;

    /// Settlement log for a fund, oldest first.
    async fn list_settlements(&self, fund: &FundId)
        -> Result<Vec<SettlementRecord>, SettlementError>;
}

type FeeKey = (FundId, FeeKind);

/// One async mutex per (fund, fee) key, created on first use.
///
/// An entry whose only owner is the map has no caller holding or waiting on
/// it, so it is dropped the next time any key is looked up. The map stays as
/// large as the set of keys in flight.
#[derive(Debug, Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<FeeKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    fn get(&self, fund: &FundId, kind: FeeKind) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry((fund.clone(), kind))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Runs fee settlements against a [`FeeStore`], one at a time per fee.
#[derive(Debug, Clone)]
pub struct Settler {
    store: Arc<dyn FeeStore>,
    ctx: DecimalContext,
    compounding_step_seconds: u64,
    locks: Arc<KeyedLocks>,
}

impl Settler {
    /// `compounding_step_seconds` is the longest interval raised in a single
    /// `rpow`; longer gaps are compounded step by step.
    pub fn new(
        store: Arc<dyn FeeStore>,
        ctx: DecimalContext,
        compounding_step_seconds: u64,
    ) -> Self {
        Self {
            store,
            ctx,
            compounding_step_seconds,
            locks: Arc::new(KeyedLocks::default()),
        }
    }

    pub fn from_config(store: Arc<dyn FeeStore>, config: &Config) -> Self {
        Self::new(store, config.decimal_context(), config.compounding_step_seconds)
    }

    pub fn decimal_context(&self) -> &DecimalContext {
        &self.ctx
    }

    /// Converts `annual_rate` once and starts accruing from `now`.
    pub async fn activate_management_fee(
        &self,
        fund: &FundId,
        annual_rate: UFixed18,
        now: UnixSeconds,
    ) -> Result<ManagementFeeRecord, SettlementError> {
        let lock = self.locks.get(fund, FeeKind::Management);
        let _guard = lock.lock().await;

        let fee = ManagementFee::from_annual_rate(&self.ctx, annual_rate)?;
        let record = ManagementFeeRecord {
            fund: fund.clone(),
            annual_rate,
            fee,
            state: ManagementFeeState::new(now.as_u64()),
        };
        if !self.store.insert_management_fee(&record).await? {
            return Err(SettlementError::AlreadyActive {
                fund: fund.clone(),
                kind: FeeKind::Management,
            });
        }

        info!(
            "Activated management fee for {}: annual rate {} -> scaled per-second rate {}",
            fund,
            annual_rate,
            fee.scaled_per_second_rate()
        );
        Ok(record)
    }

    /// Starts a performance fee with both marks at `initial_share_price`.
    pub async fn activate_performance_fee(
        &self,
        fund: &FundId,
        rate: UFixed18,
        initial_share_price: UFixed18,
    ) -> Result<PerformanceFeeRecord, SettlementError> {
        let lock = self.locks.get(fund, FeeKind::Performance);
        let _guard = lock.lock().await;

        let record = PerformanceFeeRecord {
            fund: fund.clone(),
            fee: PerformanceFee::new(rate)?,
            state: PerformanceFeeState::new(initial_share_price),
            shares_outstanding: 0,
        };
        if !self.store.insert_performance_fee(&record).await? {
            return Err(SettlementError::AlreadyActive {
                fund: fund.clone(),
                kind: FeeKind::Performance,
            });
        }

        info!(
            "Activated performance fee for {}: rate {}, initial share price {}",
            fund, rate, initial_share_price
        );
        Ok(record)
    }

    pub async fn settle_management_fee(
        &self,
        fund: &FundId,
        shares_supply: u128,
        now: UnixSeconds,
    ) -> Result<ManagementOutcome, SettlementError> {
        let lock = self.locks.get(fund, FeeKind::Management);
        let _guard = lock.lock().await;

        let record = self
            .store
            .load_management_fee(fund)
            .await?
            .ok_or_else(|| SettlementError::NotActive {
                fund: fund.clone(),
                kind: FeeKind::Management,
            })?;

        let settlement = record
            .fee
            .settle_in_steps(
                &self.ctx,
                record.state,
                shares_supply,
                now.as_u64(),
                self.compounding_step_seconds,
            )
            .inspect_err(|e| warn!("Management settlement for {} failed: {}", fund, e))?;

        if settlement.state == record.state {
            debug!("Management fee for {} already settled at {}", fund, now.as_u64());
            return Ok(ManagementOutcome {
                shares_due: 0,
                state: record.state,
            });
        }

        let log = SettlementRecord {
            fund: fund.clone(),
            kind: FeeKind::Management,
            hook: None,
            shares_due: i128::try_from(settlement.shares_due).map_err(|_| FeeError::Overflow)?,
            settled_at: now,
        };
        self.store
            .commit_management_settlement(fund, &settlement.state, &log)
            .await?;

        info!(
            "Settled management fee for {}: {} shares due on supply {}",
            fund, settlement.shares_due, shares_supply
        );
        Ok(ManagementOutcome {
            shares_due: settlement.shares_due,
            state: settlement.state,
        })
    }

    /// `total_shares_supply` includes the shares already outstanding for the
    /// fee; the settler tracks those itself.
    pub async fn settle_performance_fee(
        &self,
        fund: &FundId,
        total_shares_supply: u128,
        gav: u128,
        hook: FeeHook,
        now: UnixSeconds,
    ) -> Result<PerformanceOutcome, SettlementError> {
        let lock = self.locks.get(fund, FeeKind::Performance);
        let _guard = lock.lock().await;

        let record = self
            .store
            .load_performance_fee(fund)
            .await?
            .ok_or_else(|| SettlementError::NotActive {
                fund: fund.clone(),
                kind: FeeKind::Performance,
            })?;

        let valuation = FundValuation {
            total_shares_supply,
            shares_outstanding: record.shares_outstanding,
            gav,
        };
        let settlement = record
            .fee
            .settle(&record.state, &valuation, hook)
            .inspect_err(|e| warn!("Performance settlement ({}) for {} failed: {}", hook, fund, e))?;

        debug!(
            "Performance fee for {}: price {} next {} aggregate value due {}",
            fund,
            settlement.share_price,
            settlement.next_share_price,
            settlement.state.aggregate_value_due
        );

        let log = SettlementRecord {
            fund: fund.clone(),
            kind: FeeKind::Performance,
            hook: Some(hook.kind()),
            shares_due: settlement.shares_due,
            settled_at: now,
        };
        self.store
            .commit_performance_settlement(fund, &settlement.state, settlement.settled_shares, &log)
            .await?;

        info!(
            "Settled performance fee for {} at {}: {} shares due, {} outstanding",
            fund, hook, settlement.shares_due, settlement.settled_shares
        );
        Ok(PerformanceOutcome {
            settlement,
            shares_outstanding: settlement.settled_shares,
        })
    }

    pub async fn fee_states(&self, fund: &FundId) -> Result<FundFees, SettlementError> {
        Ok(FundFees {
            management: self.store.load_management_fee(fund).await?,
            performance: self.store.load_performance_fee(fund).await?,
        })
    }

    pub async fn settlements(&self, fund: &FundId) -> Result<Vec<SettlementRecord>, SettlementError> {
        self.store.list_settlements(fund).await
    }

    /// Scaled per-second rate for a fund's management fee, if active.
    pub async fn scaled_per_second_rate(
        &self,
        fund: &FundId,
    ) -> Result<Option<UFixed27>, SettlementError> {
        Ok(self
            .store
            .load_management_fee(fund)
            .await?
            .map(|record| record.fee.scaled_per_second_rate()))
    }
}

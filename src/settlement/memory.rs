use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    FeeStore, ManagementFeeRecord, PerformanceFeeRecord, SettlementError, SettlementRecord,
};
use crate::domain::FundId;
use crate::engine::{ManagementFeeState, PerformanceFeeState};

#[derive(Debug, Default)]
struct Inner {
    management: HashMap<FundId, ManagementFeeRecord>,
    performance: HashMap<FundId, PerformanceFeeRecord>,
    settlements: Vec<SettlementRecord>,
}

/// In-memory [`FeeStore`] for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryFeeStore {
    inner: RwLock<Inner>,
}

impl MemoryFeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(fund: &FundId, kind: crate::domain::FeeKind) -> SettlementError {
        SettlementError::NotActive {
            fund: fund.clone(),
            kind,
        }
    }
}

#[async_trait]
impl FeeStore for MemoryFeeStore {
    async fn load_management_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<ManagementFeeRecord>, SettlementError> {
        Ok(self.inner.read().await.management.get(fund).cloned())
    }

    async fn insert_management_fee(
        &self,
        record: &ManagementFeeRecord,
    ) -> Result<bool, SettlementError> {
        let mut inner = self.inner.write().await;
        if inner.management.contains_key(&record.fund) {
            return Ok(false);
        }
        inner.management.insert(record.fund.clone(), record.clone());
        Ok(true)
    }

    async fn commit_management_settlement(
        &self,
        fund: &FundId,
        state: &ManagementFeeState,
        log: &SettlementRecord,
    ) -> Result<(), SettlementError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .management
            .get_mut(fund)
            .ok_or_else(|| Self::missing(fund, crate::domain::FeeKind::Management))?;
        record.state = *state;
        inner.settlements.push(log.clone());
        Ok(())
    }

    async fn load_performance_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<PerformanceFeeRecord>, SettlementError> {
        Ok(self.inner.read().await.performance.get(fund).cloned())
    }

    async fn insert_performance_fee(
        &self,
        record: &PerformanceFeeRecord,
    ) -> Result<bool, SettlementError> {
        let mut inner = self.inner.write().await;
        if inner.performance.contains_key(&record.fund) {
            return Ok(false);
        }
        inner.performance.insert(record.fund.clone(), record.clone());
        Ok(true)
    }

    async fn commit_performance_settlement(
        &self,
        fund: &FundId,
        state: &PerformanceFeeState,
        shares_outstanding: u128,
        log: &SettlementRecord,
    ) -> Result<(), SettlementError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .performance
            .get_mut(fund)
            .ok_or_else(|| Self::missing(fund, crate::domain::FeeKind::Performance))?;
        record.state = *state;
        record.shares_outstanding = shares_outstanding;
        inner.settlements.push(log.clone());
        Ok(())
    }

    async fn list_settlements(
        &self,
        fund: &FundId,
    ) -> Result<Vec<SettlementRecord>, SettlementError> {
        Ok(self
            .inner
            .read()
            .await
            .settlements
            .iter()
            .filter(|record| &record.fund == fund)
            .cloned()
            .collect())
    }
}

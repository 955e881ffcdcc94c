//! Repository layer over the fee database.
//!
//! Methods are split across submodules:
//! - `fees.rs` - management and performance fee rows
//! - `settlements.rs` - the settlement log

mod fees;
mod settlements;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::domain::FundId;
use crate::engine::{ManagementFeeState, PerformanceFeeState};
use crate::settlement::{
    FeeStore, ManagementFeeRecord, PerformanceFeeRecord, SettlementError, SettlementRecord,
};

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

/// Reads a decimal-string column back into an integer.
fn parse_column<T: std::str::FromStr>(column: &str, raw: &str) -> Result<T, SettlementError> {
    raw.parse::<T>()
        .map_err(|_| SettlementError::Store(format!("corrupt {} value: {:?}", column, raw)))
}

fn to_sql_time(secs: u64) -> Result<i64, SettlementError> {
    i64::try_from(secs).map_err(|_| SettlementError::Store(format!("timestamp {} out of range", secs)))
}

fn from_sql_time(column: &str, secs: i64) -> Result<u64, SettlementError> {
    u64::try_from(secs)
        .map_err(|_| SettlementError::Store(format!("corrupt {} value: {}", column, secs)))
}

#[async_trait]
impl FeeStore for Repository {
    async fn load_management_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<ManagementFeeRecord>, SettlementError> {
        self.get_management_fee(fund).await
    }

    async fn insert_management_fee(
        &self,
        record: &ManagementFeeRecord,
    ) -> Result<bool, SettlementError> {
        Repository::insert_management_fee(self, record).await
    }

    async fn commit_management_settlement(
        &self,
        fund: &FundId,
        state: &ManagementFeeState,
        log: &SettlementRecord,
    ) -> Result<(), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE management_fees SET last_settled_at = ?
            WHERE fund_id = ?
            "#,
        )
        .bind(to_sql_time(state.last_settled_timestamp)?)
        .bind(fund.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(SettlementError::NotActive {
                fund: fund.clone(),
                kind: log.kind,
            });
        }
        settlements::append(&mut tx, log).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_performance_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<PerformanceFeeRecord>, SettlementError> {
        self.get_performance_fee(fund).await
    }

    async fn insert_performance_fee(
        &self,
        record: &PerformanceFeeRecord,
    ) -> Result<bool, SettlementError> {
        Repository::insert_performance_fee(self, record).await
    }

    async fn commit_performance_settlement(
        &self,
        fund: &FundId,
        state: &PerformanceFeeState,
        shares_outstanding: u128,
        log: &SettlementRecord,
    ) -> Result<(), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE performance_fees
            SET high_water_mark = ?, last_share_price = ?,
                aggregate_value_due = ?, shares_outstanding = ?
            WHERE fund_id = ?
            "#,
        )
        .bind(state.high_water_mark.to_string())
        .bind(state.last_share_price.to_string())
        .bind(state.aggregate_value_due.to_string())
        .bind(shares_outstanding.to_string())
        .bind(fund.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(SettlementError::NotActive {
                fund: fund.clone(),
                kind: log.kind,
            });
        }
        settlements::append(&mut tx, log).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_settlements(
        &self,
        fund: &FundId,
    ) -> Result<Vec<SettlementRecord>, SettlementError> {
        self.query_settlements(fund).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{FeeKind, UnixSeconds};
    use crate::engine::{FeeHookKind, ManagementFee, PerformanceFee};
    use crate::math::fixed_point::{UFixed18, UFixed27, RATE_SCALE, UNIT};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn fund() -> FundId {
        FundId::from_str("fund-a").unwrap()
    }

    fn management_record() -> ManagementFeeRecord {
        ManagementFeeRecord {
            fund: fund(),
            annual_rate: UFixed18(UNIT / 50),
            fee: ManagementFee::new(UFixed27(RATE_SCALE + 640_623_646)).unwrap(),
            state: ManagementFeeState::new(1_700_000_000),
        }
    }

    fn performance_record() -> PerformanceFeeRecord {
        PerformanceFeeRecord {
            fund: fund(),
            fee: PerformanceFee::new(UFixed18(UNIT / 5)).unwrap(),
            state: PerformanceFeeState::new(UFixed18::ONE),
            shares_outstanding: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_load_management_fee() {
        let (repo, _temp) = setup_test_db().await;
        let record = management_record();

        assert!(Repository::insert_management_fee(&repo, &record).await.unwrap());
        assert!(!Repository::insert_management_fee(&repo, &record).await.unwrap());

        let loaded = repo.load_management_fee(&fund()).await.unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_unknown_fund_loads_none() {
        let (repo, _temp) = setup_test_db().await;
        assert!(repo.load_management_fee(&fund()).await.unwrap().is_none());
        assert!(repo.load_performance_fee(&fund()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_performance_settlement_updates_state_and_log() {
        let (repo, _temp) = setup_test_db().await;
        Repository::insert_performance_fee(&repo, &performance_record())
            .await
            .unwrap();

        let state = PerformanceFeeState {
            high_water_mark: UFixed18(1_200_000_000_000_000_000),
            last_share_price: UFixed18(1_200_000_000_000_000_000),
            aggregate_value_due: 40 * UNIT,
        };
        let log = SettlementRecord {
            fund: fund(),
            kind: FeeKind::Performance,
            hook: Some(FeeHookKind::Continuous),
            shares_due: 34_482_758_620_689_655_172,
            settled_at: UnixSeconds::new(1_700_000_100),
        };
        repo.commit_performance_settlement(&fund(), &state, 34_482_758_620_689_655_172, &log)
            .await
            .unwrap();

        let loaded = repo.load_performance_fee(&fund()).await.unwrap().unwrap();
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.shares_outstanding, 34_482_758_620_689_655_172);
        assert_eq!(repo.list_settlements(&fund()).await.unwrap(), vec![log]);
    }

    #[tokio::test]
    async fn test_negative_shares_due_roundtrip() {
        let (repo, _temp) = setup_test_db().await;
        Repository::insert_performance_fee(&repo, &performance_record())
            .await
            .unwrap();
        let log = SettlementRecord {
            fund: fund(),
            kind: FeeKind::Performance,
            hook: Some(FeeHookKind::PreRedeemShares),
            shares_due: -45_517_241_379_310_344_828,
            settled_at: UnixSeconds::new(5),
        };
        repo.commit_performance_settlement(
            &fund(),
            &PerformanceFeeState::new(UFixed18::ONE),
            0,
            &log,
        )
        .await
        .unwrap();
        assert_eq!(repo.list_settlements(&fund()).await.unwrap(), vec![log]);
    }

    #[tokio::test]
    async fn test_commit_for_missing_fee_rolls_back() {
        let (repo, _temp) = setup_test_db().await;
        let log = SettlementRecord {
            fund: fund(),
            kind: FeeKind::Management,
            hook: None,
            shares_due: 1,
            settled_at: UnixSeconds::new(10),
        };
        let err = repo
            .commit_management_settlement(&fund(), &ManagementFeeState::new(10), &log)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::NotActive { .. }));
        assert!(repo.list_settlements(&fund()).await.unwrap().is_empty());
    }
}

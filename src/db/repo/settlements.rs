//! Append-only settlement log.

use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;

use super::{from_sql_time, parse_column, to_sql_time, Repository};
use crate::domain::{FeeKind, FundId, UnixSeconds};
use crate::engine::FeeHookKind;
use crate::settlement::{SettlementError, SettlementRecord};

/// Appends one log line inside the caller's transaction.
pub(super) async fn append(
    tx: &mut Transaction<'_, Sqlite>,
    log: &SettlementRecord,
) -> Result<(), SettlementError> {
    sqlx::query(
        r#"
        INSERT INTO settlements (fund_id, fee_kind, hook, shares_due, settled_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(log.fund.as_str())
    .bind(log.kind.as_str())
    .bind(log.hook.map(|hook| hook.as_str()))
    .bind(log.shares_due.to_string())
    .bind(to_sql_time(log.settled_at.as_u64())?)
    .bind(chrono::Utc::now().timestamp_millis())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl Repository {
    /// Settlement log for a fund in insertion order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn query_settlements(
        &self,
        fund: &FundId,
    ) -> Result<Vec<SettlementRecord>, SettlementError> {
        let rows = sqlx::query(
            r#"
            SELECT fund_id, fee_kind, hook, shares_due, settled_at
            FROM settlements
            WHERE fund_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(fund.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SettlementRecord, SettlementError> {
                let kind = FeeKind::from_str(&row.get::<String, _>("fee_kind"))
                    .map_err(SettlementError::Store)?;
                let hook = row
                    .get::<Option<String>, _>("hook")
                    .map(|tag| FeeHookKind::from_str(&tag))
                    .transpose()?;
                Ok(SettlementRecord {
                    fund: FundId::new(row.get::<String, _>("fund_id")),
                    kind,
                    hook,
                    shares_due: parse_column("shares_due", &row.get::<String, _>("shares_due"))?,
                    settled_at: UnixSeconds::new(from_sql_time(
                        "settled_at",
                        row.get::<i64, _>("settled_at"),
                    )?),
                })
            })
            .collect()
    }
}

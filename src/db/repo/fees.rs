//! Management and performance fee rows.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{from_sql_time, parse_column, to_sql_time, Repository};
use crate::domain::FundId;
use crate::engine::{ManagementFee, ManagementFeeState, PerformanceFee, PerformanceFeeState};
use crate::math::fixed_point::{UFixed18, UFixed27};
use crate::settlement::{ManagementFeeRecord, PerformanceFeeRecord, SettlementError};

impl Repository {
    /// Inserts a management fee unless the fund already has one.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_management_fee(
        &self,
        record: &ManagementFeeRecord,
    ) -> Result<bool, SettlementError> {
        let result = sqlx::query(
            r#"
            INSERT INTO management_fees (
                fund_id, annual_rate, scaled_per_second_rate, last_settled_at, created_at
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(fund_id) DO NOTHING
            "#,
        )
        .bind(record.fund.as_str())
        .bind(record.annual_rate.to_string())
        .bind(record.fee.scaled_per_second_rate().to_string())
        .bind(to_sql_time(record.state.last_settled_timestamp)?)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn get_management_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<ManagementFeeRecord>, SettlementError> {
        let row = sqlx::query(
            r#"
            SELECT fund_id, annual_rate, scaled_per_second_rate, last_settled_at
            FROM management_fees
            WHERE fund_id = ?
            "#,
        )
        .bind(fund.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| management_from_row(&row)).transpose()
    }

    /// Inserts a performance fee unless the fund already has one.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_performance_fee(
        &self,
        record: &PerformanceFeeRecord,
    ) -> Result<bool, SettlementError> {
        let result = sqlx::query(
            r#"
            INSERT INTO performance_fees (
                fund_id, rate, high_water_mark, last_share_price,
                aggregate_value_due, shares_outstanding, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(fund_id) DO NOTHING
            "#,
        )
        .bind(record.fund.as_str())
        .bind(record.fee.rate().to_string())
        .bind(record.state.high_water_mark.to_string())
        .bind(record.state.last_share_price.to_string())
        .bind(record.state.aggregate_value_due.to_string())
        .bind(record.shares_outstanding.to_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn get_performance_fee(
        &self,
        fund: &FundId,
    ) -> Result<Option<PerformanceFeeRecord>, SettlementError> {
        let row = sqlx::query(
            r#"
            SELECT fund_id, rate, high_water_mark, last_share_price,
                   aggregate_value_due, shares_outstanding
            FROM performance_fees
            WHERE fund_id = ?
            "#,
        )
        .bind(fund.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| performance_from_row(&row)).transpose()
    }
}

fn management_from_row(row: &SqliteRow) -> Result<ManagementFeeRecord, SettlementError> {
    let scaled: u128 = parse_column(
        "scaled_per_second_rate",
        &row.get::<String, _>("scaled_per_second_rate"),
    )?;
    Ok(ManagementFeeRecord {
        fund: FundId::new(row.get::<String, _>("fund_id")),
        annual_rate: UFixed18(parse_column("annual_rate", &row.get::<String, _>("annual_rate"))?),
        fee: ManagementFee::new(UFixed27(scaled))?,
        state: ManagementFeeState::new(from_sql_time(
            "last_settled_at",
            row.get::<i64, _>("last_settled_at"),
        )?),
    })
}

fn performance_from_row(row: &SqliteRow) -> Result<PerformanceFeeRecord, SettlementError> {
    let rate: u128 = parse_column("rate", &row.get::<String, _>("rate"))?;
    Ok(PerformanceFeeRecord {
        fund: FundId::new(row.get::<String, _>("fund_id")),
        fee: PerformanceFee::new(UFixed18(rate))?,
        state: PerformanceFeeState {
            high_water_mark: UFixed18(parse_column(
                "high_water_mark",
                &row.get::<String, _>("high_water_mark"),
            )?),
            last_share_price: UFixed18(parse_column(
                "last_share_price",
                &row.get::<String, _>("last_share_price"),
            )?),
            aggregate_value_due: parse_column(
                "aggregate_value_due",
                &row.get::<String, _>("aggregate_value_due"),
            )?,
        },
        shares_outstanding: parse_column(
            "shares_outstanding",
            &row.get::<String, _>("shares_outstanding"),
        )?,
    })
}

//! Stateful per-fund fee endpoints backed by the [`Settler`](crate::settlement::Settler).

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::{invalid_field, AppState};
use crate::domain::{parse_amount, parse_ufixed18, FeeKind, FundId, UnixSeconds};
use crate::engine::{FeeHook, FeeHookKind};
use crate::error::AppError;
use crate::math::fixed_point::UFixed18;
use crate::settlement::{ManagementFeeRecord, PerformanceFeeRecord, SettlementRecord};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateManagementRequest {
    pub annual_rate: String,
    /// Defaults to the current time.
    pub activated_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleManagementRequest {
    pub shares_supply: String,
    /// Defaults to the current time.
    pub timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatePerformanceRequest {
    pub rate: String,
    /// Defaults to one unit.
    pub initial_share_price: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlePerformanceRequest {
    pub hook: String,
    pub investment_amount: Option<String>,
    pub shares_redeemed: Option<String>,
    pub total_shares_supply: String,
    pub gav: String,
    pub timestamp: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementFeeDto {
    pub annual_rate: String,
    pub scaled_per_second_rate: String,
    pub last_settled_timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceFeeDto {
    pub rate: String,
    pub high_water_mark: String,
    pub last_share_price: String,
    pub aggregate_value_due: String,
    pub shares_outstanding: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementSettlementResponse {
    pub shares_due: String,
    pub last_settled_timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSettlementResponse {
    pub hook: String,
    pub shares_due: String,
    pub shares_outstanding: String,
    pub share_price: String,
    pub next_share_price: String,
    pub high_water_mark: String,
    pub aggregate_value_due: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundFeesResponse {
    pub fund_id: String,
    pub management: Option<ManagementFeeDto>,
    pub performance: Option<PerformanceFeeDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDto {
    pub fee_kind: FeeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    pub shares_due: String,
    pub settled_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementsResponse {
    pub fund_id: String,
    pub settlements: Vec<SettlementDto>,
}

impl From<&ManagementFeeRecord> for ManagementFeeDto {
    fn from(record: &ManagementFeeRecord) -> Self {
        ManagementFeeDto {
            annual_rate: record.annual_rate.to_string(),
            scaled_per_second_rate: record.fee.scaled_per_second_rate().to_string(),
            last_settled_timestamp: record.state.last_settled_timestamp,
        }
    }
}

impl From<&PerformanceFeeRecord> for PerformanceFeeDto {
    fn from(record: &PerformanceFeeRecord) -> Self {
        PerformanceFeeDto {
            rate: record.fee.rate().to_string(),
            high_water_mark: record.state.high_water_mark.to_string(),
            last_share_price: record.state.last_share_price.to_string(),
            aggregate_value_due: record.state.aggregate_value_due.to_string(),
            shares_outstanding: record.shares_outstanding.to_string(),
        }
    }
}

impl From<&SettlementRecord> for SettlementDto {
    fn from(record: &SettlementRecord) -> Self {
        SettlementDto {
            fee_kind: record.kind,
            hook: record.hook.map(|hook| hook.as_str().to_string()),
            shares_due: record.shares_due.to_string(),
            settled_at: record.settled_at.as_u64(),
        }
    }
}

fn parse_fund(raw: &str) -> Result<FundId, AppError> {
    FundId::from_str(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn timestamp_or_now(timestamp: Option<u64>) -> UnixSeconds {
    timestamp.map(UnixSeconds::new).unwrap_or_else(UnixSeconds::now)
}

/// Picks the trade amount that belongs to the hook; other amounts are ignored.
fn parse_hook(req: &SettlePerformanceRequest) -> Result<FeeHook, AppError> {
    let kind = FeeHookKind::from_str(&req.hook)?;
    let amount = match kind {
        FeeHookKind::PreBuyShares => req
            .investment_amount
            .as_deref()
            .map(parse_amount)
            .transpose()
            .map_err(invalid_field("investmentAmount"))?,
        FeeHookKind::PreRedeemShares => req
            .shares_redeemed
            .as_deref()
            .map(parse_amount)
            .transpose()
            .map_err(invalid_field("sharesRedeemed"))?,
        FeeHookKind::Continuous | FeeHookKind::PostBuyShares => None,
    };
    Ok(FeeHook::from_parts(kind.as_str(), amount)?)
}

pub async fn activate_management_fee(
    Path(fund): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ActivateManagementRequest>,
) -> Result<Json<ManagementFeeDto>, AppError> {
    let fund = parse_fund(&fund)?;
    let annual_rate = parse_ufixed18(&req.annual_rate).map_err(invalid_field("annualRate"))?;

    let record = state
        .settler
        .activate_management_fee(&fund, annual_rate, timestamp_or_now(req.activated_at))
        .await?;

    Ok(Json(ManagementFeeDto::from(&record)))
}

pub async fn settle_management_fee(
    Path(fund): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SettleManagementRequest>,
) -> Result<Json<ManagementSettlementResponse>, AppError> {
    let fund = parse_fund(&fund)?;
    let shares_supply = parse_amount(&req.shares_supply).map_err(invalid_field("sharesSupply"))?;

    let outcome = state
        .settler
        .settle_management_fee(&fund, shares_supply, timestamp_or_now(req.timestamp))
        .await?;

    Ok(Json(ManagementSettlementResponse {
        shares_due: outcome.shares_due.to_string(),
        last_settled_timestamp: outcome.state.last_settled_timestamp,
    }))
}

pub async fn activate_performance_fee(
    Path(fund): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ActivatePerformanceRequest>,
) -> Result<Json<PerformanceFeeDto>, AppError> {
    let fund = parse_fund(&fund)?;
    let rate = parse_ufixed18(&req.rate).map_err(invalid_field("rate"))?;
    let initial_share_price = match req.initial_share_price.as_deref() {
        Some(raw) => parse_ufixed18(raw).map_err(invalid_field("initialSharePrice"))?,
        None => UFixed18::ONE,
    };

    let record = state
        .settler
        .activate_performance_fee(&fund, rate, initial_share_price)
        .await?;

    Ok(Json(PerformanceFeeDto::from(&record)))
}

pub async fn settle_performance_fee(
    Path(fund): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SettlePerformanceRequest>,
) -> Result<Json<PerformanceSettlementResponse>, AppError> {
    let fund = parse_fund(&fund)?;
    let hook = parse_hook(&req)?;
    let total_shares_supply =
        parse_amount(&req.total_shares_supply).map_err(invalid_field("totalSharesSupply"))?;
    let gav = parse_amount(&req.gav).map_err(invalid_field("gav"))?;

    let outcome = state
        .settler
        .settle_performance_fee(
            &fund,
            total_shares_supply,
            gav,
            hook,
            timestamp_or_now(req.timestamp),
        )
        .await?;
    let settlement = outcome.settlement;

    Ok(Json(PerformanceSettlementResponse {
        hook: hook.to_string(),
        shares_due: settlement.shares_due.to_string(),
        shares_outstanding: outcome.shares_outstanding.to_string(),
        share_price: settlement.share_price.to_string(),
        next_share_price: settlement.next_share_price.to_string(),
        high_water_mark: settlement.state.high_water_mark.to_string(),
        aggregate_value_due: settlement.state.aggregate_value_due.to_string(),
    }))
}

pub async fn get_fees(
    Path(fund): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FundFeesResponse>, AppError> {
    let fund = parse_fund(&fund)?;
    let fees = state.settler.fee_states(&fund).await?;
    if fees.management.is_none() && fees.performance.is_none() {
        return Err(AppError::NotFound(format!("No fees configured for fund {}", fund)));
    }

    Ok(Json(FundFeesResponse {
        fund_id: fund.to_string(),
        management: fees.management.as_ref().map(ManagementFeeDto::from),
        performance: fees.performance.as_ref().map(PerformanceFeeDto::from),
    }))
}

pub async fn get_settlements(
    Path(fund): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SettlementsResponse>, AppError> {
    let fund = parse_fund(&fund)?;
    let settlements = state.settler.settlements(&fund).await?;

    Ok(Json(SettlementsResponse {
        fund_id: fund.to_string(),
        settlements: settlements.iter().map(SettlementDto::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(hook: &str) -> SettlePerformanceRequest {
        SettlePerformanceRequest {
            hook: hook.to_string(),
            investment_amount: Some("500".to_string()),
            shares_redeemed: Some("200".to_string()),
            total_shares_supply: "1000".to_string(),
            gav: "1000".to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn test_parse_hook_takes_matching_amount() {
        assert_eq!(
            parse_hook(&request("PreBuyShares")).unwrap(),
            FeeHook::PreBuyShares {
                investment_amount: 500
            }
        );
        assert_eq!(
            parse_hook(&request("preRedeemShares")).unwrap(),
            FeeHook::PreRedeemShares {
                shares_redeemed: 200
            }
        );
        assert_eq!(parse_hook(&request("Continuous")).unwrap(), FeeHook::Continuous);
    }

    #[test]
    fn test_parse_hook_missing_amount_is_unprocessable() {
        let mut req = request("PreRedeemShares");
        req.shares_redeemed = None;
        assert!(matches!(parse_hook(&req), Err(AppError::Unprocessable(_))));
    }

    #[test]
    fn test_parse_hook_unknown_tag() {
        assert!(matches!(
            parse_hook(&request("PostRedeemShares")),
            Err(AppError::Unprocessable(_))
        ));
    }
}

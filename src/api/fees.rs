//! Stateless entrance and exit fee quotes.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::invalid_field;
use crate::domain::{parse_amount, parse_bps, parse_ufixed18};
use crate::engine::{entrance_fee_shares_due, exit_fee_shares_due, net_shares_after_entrance_fee};
use crate::error::{AppError, FeeError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntranceFeeRequest {
    pub rate: String,
    pub shares_bought: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitFeeRequest {
    pub rate_bps: String,
    pub shares_redeemed: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuoteResponse {
    pub fee_shares: String,
    pub net_shares: String,
}

pub async fn entrance_fee(
    Json(req): Json<EntranceFeeRequest>,
) -> Result<Json<FeeQuoteResponse>, AppError> {
    let rate = parse_ufixed18(&req.rate).map_err(invalid_field("rate"))?;
    let shares_bought = parse_amount(&req.shares_bought).map_err(invalid_field("sharesBought"))?;

    let fee_shares = entrance_fee_shares_due(rate, shares_bought)?;
    let net_shares = net_shares_after_entrance_fee(rate, shares_bought)?;

    Ok(Json(FeeQuoteResponse {
        fee_shares: fee_shares.to_string(),
        net_shares: net_shares.to_string(),
    }))
}

pub async fn exit_fee(Json(req): Json<ExitFeeRequest>) -> Result<Json<FeeQuoteResponse>, AppError> {
    let rate = parse_bps(&req.rate_bps).map_err(invalid_field("rateBps"))?;
    let shares_redeemed =
        parse_amount(&req.shares_redeemed).map_err(invalid_field("sharesRedeemed"))?;

    let fee_shares = exit_fee_shares_due(rate, shares_redeemed)?;
    let net_shares = shares_redeemed.checked_sub(fee_shares).ok_or(FeeError::Overflow)?;

    Ok(Json(FeeQuoteResponse {
        fee_shares: fee_shares.to_string(),
        net_shares: net_shares.to_string(),
    }))
}

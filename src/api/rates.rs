use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{invalid_field, AppState};
use crate::domain::{parse_ufixed18, parse_ufixed27, Decimal};
use crate::error::AppError;
use crate::math::rate::{from_scaled_per_second_rate, to_scaled_per_second_rate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToScaledRequest {
    /// 18-decimal raw integer or a human decimal such as `"0.02"`.
    pub annual_rate: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromScaledRequest {
    pub scaled_per_second_rate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub annual_rate: String,
    pub annual_rate_decimal: String,
    pub scaled_per_second_rate: String,
}

pub async fn to_scaled(
    State(state): State<AppState>,
    Json(req): Json<ToScaledRequest>,
) -> Result<Json<RateResponse>, AppError> {
    let annual_rate = parse_ufixed18(&req.annual_rate).map_err(invalid_field("annualRate"))?;
    let scaled = to_scaled_per_second_rate(state.decimal_context(), annual_rate)?;
    let annual_rate_decimal =
        Decimal::from_ufixed18(annual_rate).map_err(invalid_field("annualRate"))?;

    Ok(Json(RateResponse {
        annual_rate: annual_rate.to_string(),
        annual_rate_decimal: annual_rate_decimal.to_canonical_string(),
        scaled_per_second_rate: scaled.to_string(),
    }))
}

pub async fn from_scaled(
    State(state): State<AppState>,
    Json(req): Json<FromScaledRequest>,
) -> Result<Json<RateResponse>, AppError> {
    let scaled = parse_ufixed27(&req.scaled_per_second_rate)
        .map_err(invalid_field("scaledPerSecondRate"))?;
    let annual_rate = from_scaled_per_second_rate(state.decimal_context(), scaled)?;
    let annual_rate_decimal =
        Decimal::from_ufixed18(annual_rate).map_err(invalid_field("annualRate"))?;

    Ok(Json(RateResponse {
        annual_rate: annual_rate.to_string(),
        annual_rate_decimal: annual_rate_decimal.to_canonical_string(),
        scaled_per_second_rate: scaled.to_string(),
    }))
}

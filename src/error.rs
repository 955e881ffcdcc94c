use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the fee engine.
///
/// Everything here is fatal for the call that produced it: the inputs were
/// inconsistent and recomputing with the same inputs yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("Invalid fee hook: {0}")]
    InvalidFeeHook(String),
    #[error("Raw shares due {raw_shares_due} must be below shares supply {shares_supply}")]
    DilutionPrecondition {
        raw_shares_due: u128,
        shares_supply: u128,
    },
    #[error("Rate out of range: {0}")]
    RateOutOfRange(String),
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Pending trade leaves net shares supply at {0}")]
    NonPositiveNextSupply(i128),
    #[error("Settlement timestamp {now} precedes last settlement {last}")]
    ClockRegression { last: u64, now: u64 },
    #[error("Precision must be between 1 and {max} digits, got {got}")]
    PrecisionOutOfRange { got: u32, max: u32 },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unprocessable: {0}")]
    Unprocessable(String),
}

impl From<FeeError> for AppError {
    fn from(err: FeeError) -> Self {
        AppError::Unprocessable(err.to_string())
    }
}

impl From<crate::settlement::SettlementError> for AppError {
    fn from(err: crate::settlement::SettlementError) -> Self {
        use crate::settlement::SettlementError;
        match err {
            SettlementError::Fee(e) => e.into(),
            SettlementError::NotActive { .. } => AppError::NotFound(err.to_string()),
            SettlementError::AlreadyActive { .. } => AppError::Conflict(err.to_string()),
            SettlementError::Store(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_error_maps_to_unprocessable() {
        let err: AppError = FeeError::InvalidFeeHook("PostRedeemShares".to_string()).into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_settlement_errors_map_to_status() {
        use crate::domain::{FeeKind, FundId};
        use crate::settlement::SettlementError;

        let fund = FundId::new("fund-1".to_string());
        let cases = [
            (
                SettlementError::NotActive {
                    fund: fund.clone(),
                    kind: FeeKind::Management,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                SettlementError::AlreadyActive {
                    fund,
                    kind: FeeKind::Performance,
                },
                StatusCode::CONFLICT,
            ),
            (
                SettlementError::Store("disk I/O error".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SettlementError::Fee(FeeError::Overflow),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            let app_err: AppError = err.into();
            assert_eq!(app_err.into_response().status(), status);
        }
    }

    #[test]
    fn test_dilution_precondition_display() {
        let err = FeeError::DilutionPrecondition {
            raw_shares_due: 10,
            shares_supply: 10,
        };
        assert_eq!(
            err.to_string(),
            "Raw shares due 10 must be below shares supply 10"
        );
    }
}

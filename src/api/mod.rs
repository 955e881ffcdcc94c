pub mod fees;
pub mod funds;
pub mod health;
pub mod rates;

use crate::domain::QuantityParseError;
use crate::error::AppError;
use crate::math::decimal::DecimalContext;
use crate::settlement::Settler;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub settler: Settler,
}

impl AppState {
    pub fn new(settler: Settler) -> Self {
        Self { settler }
    }

    pub fn decimal_context(&self) -> &DecimalContext {
        self.settler.decimal_context()
    }
}

/// Maps a malformed request field to a 400.
pub(crate) fn invalid_field(field: &str) -> impl Fn(QuantityParseError) -> AppError + '_ {
    move |err| AppError::BadRequest(format!("Invalid {}: {}", field, err))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/rates/to-scaled", post(rates::to_scaled))
        .route("/v1/rates/from-scaled", post(rates::from_scaled))
        .route("/v1/fees/entrance", post(fees::entrance_fee))
        .route("/v1/fees/exit", post(fees::exit_fee))
        .route(
            "/v1/funds/:fund/management",
            post(funds::activate_management_fee),
        )
        .route(
            "/v1/funds/:fund/management/settle",
            post(funds::settle_management_fee),
        )
        .route(
            "/v1/funds/:fund/performance",
            post(funds::activate_performance_fee),
        )
        .route(
            "/v1/funds/:fund/performance/settle",
            post(funds::settle_performance_fee),
        )
        .route("/v1/funds/:fund/fees", get(funds::get_fees))
        .route("/v1/funds/:fund/settlements", get(funds::get_settlements))
        .layer(cors)
        .with_state(state)
}

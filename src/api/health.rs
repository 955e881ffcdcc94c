use axum::extract::State;
use axum::Json;

use crate::api::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the settler is wired; reports the precision it computes with.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "precisionDigits": state.decimal_context().precision(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::settlement::{MemoryFeeStore, Settler};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_reports_precision() {
        let mut env = HashMap::new();
        env.insert("DATABASE_PATH".to_string(), ":memory:".to_string());
        env.insert("FEE_PRECISION_DIGITS".to_string(), "20".to_string());
        let config = Config::from_env_map(env).unwrap();
        let settler = Settler::from_config(Arc::new(MemoryFeeStore::new()), &config);

        let Json(body) = ready(State(AppState::new(settler))).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["precisionDigits"], 20);
    }
}

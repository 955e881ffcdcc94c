use std::collections::HashMap;
use thiserror::Error;

use crate::math::decimal::{DecimalContext, MANAGEMENT_FEE_DIGITS};
use crate::math::fixed_point::SECONDS_PER_YEAR;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Longest interval compounded in one `rpow`; longer gaps are settled
    /// in steps of this size.
    pub compounding_step_seconds: u64,
    /// Significant digits for rate conversion and compounding.
    pub precision_digits: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let compounding_step_seconds = match env_map.get("COMPOUNDING_STEP_SECONDS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|v| *v > 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "COMPOUNDING_STEP_SECONDS".to_string(),
                    "must be a positive u64".to_string(),
                )
            })?,
            None => 10 * SECONDS_PER_YEAR,
        };

        let precision_digits = match env_map.get("FEE_PRECISION_DIGITS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue(
                    "FEE_PRECISION_DIGITS".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?,
            None => MANAGEMENT_FEE_DIGITS,
        };
        DecimalContext::new(precision_digits).map_err(|e| {
            ConfigError::InvalidValue("FEE_PRECISION_DIGITS".to_string(), e.to_string())
        })?;

        Ok(Config {
            port,
            database_path,
            compounding_step_seconds,
            precision_digits,
        })
    }

    /// The decimal context every rate computation in this process uses.
    pub fn decimal_context(&self) -> DecimalContext {
        DecimalContext::new(self.precision_digits).unwrap_or_default()
    }
}

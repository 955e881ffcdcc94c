//! Domain primitives: FundId, FeeKind, UnixSeconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a fund (vault) whose fees are tracked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FundId(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid fund id: {0}")]
pub struct FundIdParseError(pub String);

impl FundId {
    pub fn new(id: String) -> Self {
        FundId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FundId {
    type Err = FundIdParseError;

    /// Accepts 1-64 characters of `[A-Za-z0-9_-]`, or a `0x` hex address.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= 64
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(FundIdParseError(s.to_string()));
        }
        // Hex addresses compare case-insensitively.
        if trimmed.starts_with("0x") {
            return Ok(FundId(trimmed.to_ascii_lowercase()));
        }
        Ok(FundId(trimmed.to_string()))
    }
}

impl fmt::Display for FundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two stateful fees a fund can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeKind {
    Management,
    Performance,
}

impl FeeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeKind::Management => "management",
            FeeKind::Performance => "performance",
        }
    }
}

impl fmt::Display for FeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "management" => Ok(FeeKind::Management),
            "performance" => Ok(FeeKind::Performance),
            other => Err(format!("unknown fee kind: {}", other)),
        }
    }
}

/// Seconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixSeconds(pub u64);

impl UnixSeconds {
    pub fn new(secs: u64) -> Self {
        UnixSeconds(secs)
    }

    pub fn now() -> Self {
        UnixSeconds(chrono::Utc::now().timestamp().max(0) as u64)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

//! Domain types shared by the service layers.
//!
//! This module provides:
//! - Fund and fee identifiers
//! - Human-readable decimal parsing for rates, prices and amounts

pub mod decimal;
pub mod primitives;

pub use decimal::{parse_amount, parse_bps, parse_ufixed18, parse_ufixed27, Decimal, QuantityParseError};
pub use primitives::{FeeKind, FundId, FundIdParseError, UnixSeconds};

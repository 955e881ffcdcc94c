//! Lifecycle points at which the vault asks for fee settlement.

use std::fmt;
use std::str::FromStr;

use crate::error::FeeError;

/// Which lifecycle point triggered a settlement.
///
/// The two pre-trade hooks carry the pending trade so the engine can predict
/// the post-trade share price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeHook {
    Continuous,
    PreBuyShares {
        /// Denomination-asset amount about to be invested.
        investment_amount: u128,
    },
    PostBuyShares,
    PreRedeemShares {
        /// Shares about to be burned.
        shares_redeemed: u128,
    },
}

/// Tag half of a [`FeeHook`], as stored and transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeHookKind {
    Continuous,
    PreBuyShares,
    PostBuyShares,
    PreRedeemShares,
}

impl FeeHook {
    pub fn kind(&self) -> FeeHookKind {
        match self {
            FeeHook::Continuous => FeeHookKind::Continuous,
            FeeHook::PreBuyShares { .. } => FeeHookKind::PreBuyShares,
            FeeHook::PostBuyShares => FeeHookKind::PostBuyShares,
            FeeHook::PreRedeemShares { .. } => FeeHookKind::PreRedeemShares,
        }
    }

    /// Builds a hook from a tag and its optional trade amount.
    ///
    /// # Errors
    /// `InvalidFeeHook` when the tag is unknown, or when a pre-trade tag
    /// arrives without its amount.
    pub fn from_parts(tag: &str, trade_amount: Option<u128>) -> Result<Self, FeeError> {
        match tag.parse::<FeeHookKind>()? {
            FeeHookKind::Continuous => Ok(FeeHook::Continuous),
            FeeHookKind::PostBuyShares => Ok(FeeHook::PostBuyShares),
            FeeHookKind::PreBuyShares => trade_amount
                .map(|investment_amount| FeeHook::PreBuyShares { investment_amount })
                .ok_or_else(|| {
                    FeeError::InvalidFeeHook("PreBuyShares requires an investment amount".into())
                }),
            FeeHookKind::PreRedeemShares => trade_amount
                .map(|shares_redeemed| FeeHook::PreRedeemShares { shares_redeemed })
                .ok_or_else(|| {
                    FeeError::InvalidFeeHook("PreRedeemShares requires a redeemed share count".into())
                }),
        }
    }
}

impl FeeHookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeHookKind::Continuous => "Continuous",
            FeeHookKind::PreBuyShares => "PreBuyShares",
            FeeHookKind::PostBuyShares => "PostBuyShares",
            FeeHookKind::PreRedeemShares => "PreRedeemShares",
        }
    }
}

impl FromStr for FeeHookKind {
    type Err = FeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Continuous" | "continuous" => Ok(FeeHookKind::Continuous),
            "PreBuyShares" | "preBuyShares" => Ok(FeeHookKind::PreBuyShares),
            "PostBuyShares" | "postBuyShares" => Ok(FeeHookKind::PostBuyShares),
            "PreRedeemShares" | "preRedeemShares" => Ok(FeeHookKind::PreRedeemShares),
            other => Err(FeeError::InvalidFeeHook(other.to_string())),
        }
    }
}

impl fmt::Display for FeeHookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FeeHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().as_str())
    }
}

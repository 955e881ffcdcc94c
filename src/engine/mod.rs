//! Pure fee computations: no I/O, no shared state.
//!
//! Each function maps numeric inputs (rates, supplies, valuations, elapsed
//! time) plus a fee-state record to shares due and the next state. Callers
//! own persistence and must serialize settlements per fund and fee.

pub mod dilution;
pub mod entrance_exit;
pub mod hook;
pub mod management;
pub mod performance;

pub use dilution::shares_due_with_inflation;
pub use entrance_exit::{entrance_fee_shares_due, exit_fee_shares_due, net_shares_after_entrance_fee};
pub use hook::{FeeHook, FeeHookKind};
pub use management::{
    management_fee_shares_due, management_fee_shares_due_in_steps, ManagementFee, ManagementFeeSettlement, ManagementFeeState,
};
pub use performance::{
    gross_share_price, FundValuation, PerformanceFee, PerformanceFeeSettlement,
    PerformanceFeeState,
};

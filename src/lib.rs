pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod math;
pub mod settlement;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{Decimal, FeeKind, FundId, UnixSeconds};
pub use engine::{FeeHook, FeeHookKind, ManagementFee, PerformanceFee};
pub use error::{AppError, FeeError};
pub use math::{DecimalContext, UFixed18, UFixed27};
pub use settlement::{FeeStore, MemoryFeeStore, SettlementError, Settler};

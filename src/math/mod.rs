//! Fixed-point and decimal arithmetic shared by every fee computation.

pub mod decimal;
pub mod fixed_point;
pub mod rate;
pub mod rpow;

pub use decimal::{DecimalContext, Rounding, MANAGEMENT_FEE_DIGITS};
pub use fixed_point::{
    mul_div, mul_div_up, rescale, Bps, Scale, UFixed18, UFixed27, BPS_SCALE, RATE_SCALE,
    SECONDS_PER_YEAR, UNIT,
};
pub use rate::{from_scaled_per_second_rate, to_scaled_per_second_rate};
pub use rpow::rpow;

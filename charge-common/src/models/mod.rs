// File: charge-common/src/models/mod.rs
pub mod plan;
pub mod coupon;
pub mod query;

pub use plan::{NewPlan, Plan, Region};
pub use coupon::{
    Coupon, CouponState, CouponStatus, CreatedCoupon, NewCoupon, RedeemRequest, RedeemResult,
    Redemption,
};
pub use query::{FilterParam, PlanFilter, PlanSort, SortField, SortOrder};

pub mod coupon_service;
pub mod plan_service;

pub use coupon_service::CouponService;
pub use plan_service::{PlanPage, PlanQuery, PlanService};

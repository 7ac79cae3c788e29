// src/repositories/mod.rs

pub use charge_common::traits::repository_traits::{CouponRepository, PlanRepository};

pub use postgres::coupons::PostgresCouponRepository;
pub use postgres::plans::PostgresPlanRepository;

pub mod postgres;

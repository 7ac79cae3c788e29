use async_trait::async_trait;
use crate::error::Error;
use crate::models::{
    Coupon, CouponState, NewCoupon, NewPlan, Plan, PlanFilter, PlanSort, Redemption, Region,
};

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Internal id for a region code (matched lowercased). `NotFound` if unknown.
    async fn lookup_region_id(&self, region: &str) -> Result<i32, Error>;

    /// One page of active plans joined with their region.
    async fn list_plans(
        &self,
        filter: &PlanFilter,
        sort: &PlanSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Plan>, Error>;

    /// Row count for `filter`, taken from the plans table alone.
    async fn count_plans(&self, filter: &PlanFilter) -> Result<i64, Error>;

    async fn get_plan_by_id(&self, plan_id: &str) -> Result<Option<Plan>, Error>;

    /// Flips the active row to `N`. Nothing to flip is not an error.
    async fn soft_delete_plan(&self, plan_id: &str) -> Result<(), Error>;

    async fn list_regions(&self) -> Result<Vec<Region>, Error>;

    async fn create_plan(&self, plan: &NewPlan) -> Result<Plan, Error>;

    /// Deactivates the active row and inserts `plan` under the same `plan_id`.
    async fn modify_plan(&self, plan_id: &str, plan: &NewPlan) -> Result<Plan, Error>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Stores the coupon as `available`. A duplicate (serial, code) is a `Conflict`.
    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<(), Error>;

    async fn get_coupon(&self, serial: &str, code: &str) -> Result<Option<Coupon>, Error>;

    async fn fetch_redeem_state(&self, serial: &str, code: &str) -> Result<Option<CouponState>, Error>;

    /// `available` -> `expired`. Returns whether a row changed.
    async fn mark_expired(&self, serial: &str, code: &str) -> Result<bool, Error>;

    /// `available` -> `used`, recording who and when. Returns false if the
    /// coupon was no longer `available` at write time.
    async fn mark_used(&self, redemption: &Redemption) -> Result<bool, Error>;
}

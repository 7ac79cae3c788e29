// File: charge-core/src/test_utils/memory.rs
//
// In-memory repositories with the same observable behavior as the Postgres
// ones, for service and router tests that shouldn't need a database.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Barrier, Mutex};
use uuid::Uuid;

use charge_common::models::plan::{PLAN_STATUS_ACTIVE, PLAN_STATUS_DEACTIVATED};
use charge_common::models::{
    Coupon, CouponState, CouponStatus, NewCoupon, NewPlan, Plan, PlanFilter, PlanSort, Redemption,
    Region, SortField, SortOrder,
};
use charge_common::traits::repository_traits::{CouponRepository, PlanRepository};
use crate::Error;

#[derive(Debug, Clone)]
struct PlanRecord {
    id: i32,
    plan_id: String,
    plan_name: String,
    plan_type: String,
    plan_level: i32,
    specification1: String,
    specification2: String,
    price: f32,
    cycle: String,
    region_id: i32,
    hotness: i32,
    create_time: DateTime<Utc>,
    status: String,
}

#[derive(Default)]
struct PlanTables {
    regions: Vec<(i32, Region)>,
    plans: Vec<PlanRecord>,
    last_create_time: Option<DateTime<Utc>>,
}

impl PlanTables {
    fn region_id(&self, code: &str) -> Result<i32, Error> {
        let code = code.to_lowercase();
        self.regions
            .iter()
            .find(|(_, r)| r.region == code)
            .map(|(id, _)| *id)
            .ok_or_else(|| Error::NotFound(format!("region '{}'", code)))
    }

    fn joined(&self, rec: &PlanRecord) -> Plan {
        let region = self
            .regions
            .iter()
            .find(|(id, _)| *id == rec.region_id)
            .map(|(_, r)| r.clone());
        let (region, region_describe) = match region {
            Some(r) => (r.region, r.region_describe),
            None => (String::new(), String::new()),
        };
        Plan {
            id: rec.id,
            plan_id: rec.plan_id.clone(),
            plan_name: rec.plan_name.clone(),
            plan_type: rec.plan_type.clone(),
            plan_level: rec.plan_level,
            specification1: rec.specification1.clone(),
            specification2: rec.specification2.clone(),
            price: rec.price,
            cycle: rec.cycle.clone(),
            region,
            region_describe,
            create_time: rec.create_time,
            status: rec.status.clone(),
        }
    }

    fn matching<'a>(&'a self, filter: &'a PlanFilter) -> impl Iterator<Item = &'a PlanRecord> + 'a {
        self.plans.iter().filter(move |p| {
            p.status == PLAN_STATUS_ACTIVE
                && filter.region_id().is_none_or(|id| p.region_id == id)
                && filter.plan_type().is_none_or(|t| p.plan_type == t)
        })
    }

    fn has_active(&self, plan_id: &str) -> bool {
        self.plans
            .iter()
            .any(|p| p.plan_id == plan_id && p.status == PLAN_STATUS_ACTIVE)
    }

    // Strictly increasing, so newest-first ordering is deterministic.
    fn next_create_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let t = match self.last_create_time {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_create_time = Some(t);
        t
    }

    fn insert(&mut self, plan_id: String, plan: &NewPlan, region_id: i32) -> i32 {
        let id = self.plans.len() as i32 + 1;
        let create_time = self.next_create_time();
        self.plans.push(PlanRecord {
            id,
            plan_id,
            plan_name: plan.plan_name.clone(),
            plan_type: plan.plan_type.to_lowercase(),
            plan_level: plan.plan_level,
            specification1: plan.specification1.clone(),
            specification2: plan.specification2.clone(),
            price: plan.price,
            cycle: plan.cycle.clone(),
            region_id,
            hotness: 0,
            create_time,
            status: PLAN_STATUS_ACTIVE.to_string(),
        });
        id
    }

    fn by_row_id(&self, id: i32) -> Result<Plan, Error> {
        self.plans
            .iter()
            .find(|p| p.id == id)
            .map(|p| self.joined(p))
            .ok_or_else(|| Error::NotFound(format!("plan row {}", id)))
    }
}

#[derive(Default)]
pub struct InMemoryPlanRepository {
    tables: Mutex<PlanTables>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a region (code stored lowercased) and returns its id.
    pub async fn seed_region(&self, code: &str, describe: &str, identification: &str) -> i32 {
        let mut tables = self.tables.lock().await;
        let id = tables.regions.len() as i32 + 1;
        tables.regions.push((
            id,
            Region {
                region: code.to_lowercase(),
                region_describe: describe.to_string(),
                identification: identification.to_string(),
            },
        ));
        id
    }

    pub async fn set_hotness(&self, plan_id: &str, hotness: i32) {
        let mut tables = self.tables.lock().await;
        for p in tables.plans.iter_mut().filter(|p| p.plan_id == plan_id) {
            p.hotness = hotness;
        }
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn lookup_region_id(&self, region: &str) -> Result<i32, Error> {
        self.tables.lock().await.region_id(region)
    }

    async fn list_plans(
        &self,
        filter: &PlanFilter,
        sort: &PlanSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Plan>, Error> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<&PlanRecord> = tables.matching(filter).collect();
        rows.sort_by(|a, b| {
            let ord = match sort.field {
                SortField::CreateTime => a.create_time.cmp(&b.create_time),
                SortField::Hotness => a.hotness.cmp(&b.hotness),
            };
            match sort.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|p| tables.joined(p))
            .collect())
    }

    async fn count_plans(&self, filter: &PlanFilter) -> Result<i64, Error> {
        Ok(self.tables.lock().await.matching(filter).count() as i64)
    }

    async fn get_plan_by_id(&self, plan_id: &str) -> Result<Option<Plan>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .plans
            .iter()
            .find(|p| p.plan_id == plan_id && p.status == PLAN_STATUS_ACTIVE)
            .map(|p| tables.joined(p)))
    }

    async fn soft_delete_plan(&self, plan_id: &str) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        for p in tables
            .plans
            .iter_mut()
            .filter(|p| p.plan_id == plan_id && p.status == PLAN_STATUS_ACTIVE)
        {
            p.status = PLAN_STATUS_DEACTIVATED.to_string();
        }
        Ok(())
    }

    async fn list_regions(&self) -> Result<Vec<Region>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.regions.iter().map(|(_, r)| r.clone()).collect())
    }

    async fn create_plan(&self, plan: &NewPlan) -> Result<Plan, Error> {
        let mut tables = self.tables.lock().await;
        let region_id = tables.region_id(&plan.region)?;
        let plan_id = plan
            .plan_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if tables.has_active(&plan_id) {
            return Err(Error::Conflict(format!("plan '{}' already has an active row", plan_id)));
        }

        let id = tables.insert(plan_id, plan, region_id);
        tables.by_row_id(id)
    }

    async fn modify_plan(&self, plan_id: &str, plan: &NewPlan) -> Result<Plan, Error> {
        let mut tables = self.tables.lock().await;
        let region_id = tables.region_id(&plan.region)?;
        if !tables.has_active(plan_id) {
            return Err(Error::NotFound(format!("plan '{}'", plan_id)));
        }
        for p in tables
            .plans
            .iter_mut()
            .filter(|p| p.plan_id == plan_id && p.status == PLAN_STATUS_ACTIVE)
        {
            p.status = PLAN_STATUS_DEACTIVATED.to_string();
        }

        let id = tables.insert(plan_id.to_string(), plan, region_id);
        tables.by_row_id(id)
    }
}

#[derive(Default)]
pub struct InMemoryCouponRepository {
    coupons: Mutex<Vec<Coupon>>,
    write_barrier: Option<Arc<Barrier>>,
}

impl InMemoryCouponRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every `mark_used` call until `parties` callers have arrived, so
    /// all of them have read the coupon before any of them writes.
    pub fn with_write_barrier(parties: usize) -> Self {
        Self {
            coupons: Mutex::default(),
            write_barrier: Some(Arc::new(Barrier::new(parties))),
        }
    }
}

#[async_trait]
impl CouponRepository for InMemoryCouponRepository {
    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<(), Error> {
        let mut coupons = self.coupons.lock().await;
        if coupons
            .iter()
            .any(|c| c.serial == coupon.serial && c.code == coupon.code)
        {
            return Err(Error::Conflict(format!(
                "coupon serial='{}' code='{}' already exists",
                coupon.serial, coupon.code
            )));
        }
        let id = coupons.len() as i32 + 1;
        coupons.push(Coupon {
            id,
            serial: coupon.serial.clone(),
            code: coupon.code.clone(),
            kind: coupon.kind.clone(),
            expiration: coupon.expiration,
            region: coupon.region.clone(),
            amount: coupon.amount,
            status: CouponStatus::Available,
            use_time: None,
            username: None,
            namespace: None,
        });
        Ok(())
    }

    async fn get_coupon(&self, serial: &str, code: &str) -> Result<Option<Coupon>, Error> {
        let coupons = self.coupons.lock().await;
        Ok(coupons
            .iter()
            .find(|c| c.serial == serial && c.code == code)
            .cloned())
    }

    async fn fetch_redeem_state(&self, serial: &str, code: &str) -> Result<Option<CouponState>, Error> {
        let coupons = self.coupons.lock().await;
        Ok(coupons
            .iter()
            .find(|c| c.serial == serial && c.code == code)
            .map(|c| CouponState {
                amount: c.amount,
                expiration: c.expiration,
                status: c.status.clone(),
            }))
    }

    async fn mark_expired(&self, serial: &str, code: &str) -> Result<bool, Error> {
        let mut coupons = self.coupons.lock().await;
        match coupons.iter_mut().find(|c| {
            c.serial == serial && c.code == code && c.status == CouponStatus::Available
        }) {
            Some(c) => {
                c.status = CouponStatus::Expired;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_used(&self, redemption: &Redemption) -> Result<bool, Error> {
        if let Some(barrier) = &self.write_barrier {
            barrier.wait().await;
        }
        let mut coupons = self.coupons.lock().await;
        match coupons.iter_mut().find(|c| {
            c.serial == redemption.serial
                && c.code == redemption.code
                && c.status == CouponStatus::Available
        }) {
            Some(c) => {
                c.status = CouponStatus::Used;
                c.use_time = Some(redemption.use_time);
                c.username = Some(redemption.username.clone());
                c.namespace = Some(redemption.namespace.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}


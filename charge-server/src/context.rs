//! charge-server/src/context.rs
//!
//! Defines the server context: every handle the HTTP layer needs, built once.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use charge_core::db::Database;
use charge_core::http::AppState;
use charge_core::repositories::{PostgresCouponRepository, PostgresPlanRepository};
use charge_core::services::{CouponService, PlanService};
use charge_core::Error;

use crate::Args;

pub struct ServerContext {
    pub db: Database,
    pub plan_service: Arc<PlanService>,
    pub coupon_service: Arc<CouponService>,
    pub request_timeout: Duration,
}

impl ServerContext {
    /// Connects to Postgres, optionally migrates, and wires repositories into services.
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let db = Database::connect(&args.db_url, args.max_connections).await?;
        if args.migrate {
            db.migrate().await?;
        }

        let plan_repo = Arc::new(PostgresPlanRepository::new(db.pool().clone()));
        let coupon_repo = Arc::new(PostgresCouponRepository::new(db.pool().clone()));

        let plan_service = Arc::new(PlanService::new(plan_repo));
        let coupon_service = Arc::new(CouponService::new(coupon_repo));

        let request_timeout = Duration::from_millis(args.request_timeout_ms);
        info!("Request deadline set to {:?}", request_timeout);

        Ok(Self { db, plan_service, coupon_service, request_timeout })
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            plans: self.plan_service.clone(),
            coupons: self.coupon_service.clone(),
        }
    }
}

//! HTTP surface of the charge service.
//!
//! Every route runs under [`timeout::request_deadline`] and answers with the
//! JSON envelope from [`response`]. Handlers only translate between HTTP and
//! the services in `crate::services`; no state lives here beyond `AppState`.

use std::sync::Arc;
use std::time::Duration;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::services::{CouponService, PlanService};

pub mod coupons;
pub mod plans;
pub mod response;
pub mod timeout;

pub use timeout::DEFAULT_REQUEST_TIMEOUT;

/// Shared handles for handlers. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub plans: Arc<PlanService>,
    pub coupons: Arc<CouponService>,
}

async fn url_not_supported() -> Response {
    response::not_supported()
}

/// The full route table with tracing and the per-request deadline applied.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(url_not_supported).post(url_not_supported).put(url_not_supported).delete(url_not_supported))
        .route("/charge/v1/coupons", post(coupons::create_coupon))
        .route("/charge/v1/coupons/use/{serial}/{code}", put(coupons::use_coupon))
        .route("/charge/v1/plans", post(plans::create_plan).get(plans::query_plan_list))
        .route(
            "/charge/v1/plans/{id}",
            get(plans::retrieve_plan)
                .put(plans::modify_plan)
                .delete(plans::delete_plan),
        )
        .route("/charge/v1/query/plans/region", get(plans::retrieve_plan_regions))
        .fallback(url_not_supported)
        .method_not_allowed_fallback(url_not_supported)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(request_timeout, timeout::request_deadline)),
        )
}

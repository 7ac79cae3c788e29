use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use charge_common::models::{NewPlan, Plan, Region};
use super::coupons::json_body;
use super::response::{ok, ApiError, JsonResult};
use super::AppState;
use crate::query::PageRequest;
use crate::services::{PlanPage, PlanQuery};
use crate::Error;

/// Query string of `GET /charge/v1/plans`.
#[derive(Debug, Default, Deserialize)]
pub struct PlanListParams {
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: Option<String>,
    pub orderby: Option<String>,
    pub sortorder: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl From<PlanListParams> for PlanQuery {
    fn from(params: PlanListParams) -> Self {
        let page = PageRequest::from_page(params.page, params.size);
        PlanQuery {
            region: params.region.unwrap_or_default(),
            plan_type: params.plan_type.unwrap_or_default(),
            order_by: params.orderby.unwrap_or_default(),
            sort_order: params.sortorder.unwrap_or_default(),
            offset: page.offset,
            limit: page.limit,
        }
    }
}

pub async fn create_plan(
    State(state): State<AppState>,
    payload: Result<Json<NewPlan>, JsonRejection>,
) -> Result<Json<JsonResult<Plan>>, ApiError> {
    let plan = json_body(payload)?;
    let created = state.plans.create_plan(&plan).await?;
    Ok(ok(created))
}

pub async fn query_plan_list(
    State(state): State<AppState>,
    params: Result<Query<PlanListParams>, QueryRejection>,
) -> Result<Json<JsonResult<PlanPage>>, ApiError> {
    let Query(params) = params.map_err(|r| ApiError(Error::Validation(r.body_text())))?;
    info!("Begin query plan list handler.");
    let page = state.plans.query_plans(&PlanQuery::from(params)).await?;
    Ok(ok(page))
}

pub async fn retrieve_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<JsonResult<Plan>>, ApiError> {
    let plan = state.plans.get_plan(&plan_id).await?;
    Ok(ok(plan))
}

pub async fn modify_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    payload: Result<Json<NewPlan>, JsonRejection>,
) -> Result<Json<JsonResult<Plan>>, ApiError> {
    let plan = json_body(payload)?;
    let modified = state.plans.modify_plan(&plan_id, &plan).await?;
    Ok(ok(modified))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<JsonResult<String>>, ApiError> {
    state.plans.delete_plan(&plan_id).await?;
    Ok(ok(plan_id))
}

pub async fn retrieve_plan_regions(
    State(state): State<AppState>,
) -> Result<Json<JsonResult<Vec<Region>>>, ApiError> {
    let regions = state.plans.list_regions().await?;
    Ok(ok(regions))
}

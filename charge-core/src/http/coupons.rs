use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use charge_common::models::{CreatedCoupon, NewCoupon, RedeemRequest, RedeemResult};
use super::response::{ok, ApiError, JsonResult};
use super::AppState;
use crate::Error;

/// Body of `PUT /charge/v1/coupons/use/{serial}/{code}`.
#[derive(Debug, Deserialize)]
pub struct UseCouponBody {
    pub username: String,
    #[serde(default)]
    pub namespace: String,
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError(Error::Validation(rejection.body_text())))
}

pub async fn create_coupon(
    State(state): State<AppState>,
    payload: Result<Json<NewCoupon>, JsonRejection>,
) -> Result<Json<JsonResult<CreatedCoupon>>, ApiError> {
    info!("Begin create a coupon handler.");
    let coupon = json_body(payload)?;
    let created = state.coupons.create_coupon(coupon).await?;
    Ok(ok(created))
}

pub async fn use_coupon(
    State(state): State<AppState>,
    Path((serial, code)): Path<(String, String)>,
    payload: Result<Json<UseCouponBody>, JsonRejection>,
) -> Result<Json<JsonResult<RedeemResult>>, ApiError> {
    info!("Begin use a coupon handler.");
    let body = json_body(payload)?;
    if body.username.trim().is_empty() {
        return Err(ApiError(Error::Validation("username is required".into())));
    }

    let result = state
        .coupons
        .redeem_coupon(RedeemRequest {
            serial,
            code,
            username: body.username,
            namespace: body.namespace,
            use_time: Utc::now(),
        })
        .await?;
    Ok(ok(result))
}

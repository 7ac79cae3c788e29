//! JSON envelope shared by every route: `{"code": .., "msg": .., "data": ..}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::Error;

/// Envelope codes. `0` is success; every failure kind gets its own code so
/// clients can tell "expired" from "used" without parsing `msg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    None,
    InvalidParameters,
    NotFound,
    Conflict,
    CouponExpired,
    CouponUsed,
    CouponUnavailable,
    Timeout,
    UrlNotSupported,
    Internal,
}

impl ErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::None => 0,
            ErrorCode::InvalidParameters => 1300,
            ErrorCode::NotFound => 1301,
            ErrorCode::Conflict => 1302,
            ErrorCode::CouponExpired => 1310,
            ErrorCode::CouponUsed => 1311,
            ErrorCode::CouponUnavailable => 1312,
            ErrorCode::Timeout => 1400,
            ErrorCode::UrlNotSupported => 1404,
            ErrorCode::Internal => 1500,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::None => "OK",
            ErrorCode::InvalidParameters => "invalid parameters",
            ErrorCode::NotFound => "not found",
            ErrorCode::Conflict => "already exists",
            ErrorCode::CouponExpired => "the coupon has expired",
            ErrorCode::CouponUsed => "the coupon has been used",
            ErrorCode::CouponUnavailable => "the coupon is unavailable",
            ErrorCode::Timeout => "request timed out",
            ErrorCode::UrlNotSupported => "url not supported",
            ErrorCode::Internal => "internal error",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonResult<T: Serialize> {
    pub code: u32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 200 with `data` in a success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<JsonResult<T>> {
    Json(JsonResult {
        code: ErrorCode::None.code(),
        msg: ErrorCode::None.message().to_string(),
        data: Some(data),
    })
}

/// Error side of a handler. Carries the domain error to the envelope.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match &self.0 {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            Error::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            Error::CouponExpired => (StatusCode::BAD_REQUEST, ErrorCode::CouponExpired),
            Error::CouponUsed => (StatusCode::BAD_REQUEST, ErrorCode::CouponUsed),
            Error::CouponUnavailable => (StatusCode::BAD_REQUEST, ErrorCode::CouponUnavailable),
            Error::Validation(_) | Error::Json(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidParameters)
            }
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, ErrorCode::Timeout),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let msg = if status.is_server_error() {
            error!("request failed: {}", self.0);
            // Storage details stay in the log.
            code.message().to_string()
        } else {
            warn!("request rejected: {}", self.0);
            format!("{}: {}", code.message(), self.0)
        };

        let body = JsonResult::<()> { code: code.code(), msg, data: None };
        (status, Json(body)).into_response()
    }
}

/// Envelope for a request that matched no route.
pub fn not_supported() -> Response {
    let code = ErrorCode::UrlNotSupported;
    let body = JsonResult::<()> {
        code: code.code(),
        msg: code.message().to_string(),
        data: None,
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

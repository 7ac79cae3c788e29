// File: charge-common/src/models/coupon.rs

use std::fmt;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Offset of the clock coupon expirations are written in (UTC+8).
pub const COUPON_CLOCK_OFFSET_SECS: i32 = 8 * 3600;

/// Converts an instant to the wall-clock time used for coupon expirations.
pub fn coupon_clock(instant: DateTime<Utc>) -> NaiveDateTime {
    match FixedOffset::east_opt(COUPON_CLOCK_OFFSET_SECS) {
        Some(offset) => instant.with_timezone(&offset).naive_local(),
        None => instant.naive_utc(),
    }
}

/// Parses a coupon expiration.
///
/// RFC 3339 values carry their own offset and are moved onto the coupon
/// clock. Values without an offset are taken as coupon-clock wall time.
pub fn parse_expiration(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => Ok(coupon_clock(dt.with_timezone(&Utc))),
        Err(_) => text.parse::<NaiveDateTime>(),
    }
}

fn deserialize_expiration<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_expiration(&text).map_err(serde::de::Error::custom)
}

/// Lifecycle of a coupon. Only `Available` may transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CouponStatus {
    Available,
    Used,
    Expired,
    /// Anything else found in the status column.
    Unknown(String),
}

impl CouponStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CouponStatus::Available => "available",
            CouponStatus::Used => "used",
            CouponStatus::Expired => "expired",
            CouponStatus::Unknown(s) => s.as_str(),
        }
    }
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for CouponStatus {
    fn from(s: &str) -> Self {
        match s {
            "available" => CouponStatus::Available,
            "used" => CouponStatus::Used,
            "expired" => CouponStatus::Expired,
            other => CouponStatus::Unknown(other.to_string()),
        }
    }
}

impl From<String> for CouponStatus {
    fn from(s: String) -> Self {
        CouponStatus::from(s.as_str())
    }
}

impl From<CouponStatus> for String {
    fn from(status: CouponStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A stored coupon row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i32,
    pub serial: String,
    pub code: String,
    pub kind: String,
    pub expiration: NaiveDateTime,
    pub region: String,
    pub amount: f32,
    pub status: CouponStatus,
    pub use_time: Option<NaiveDateTime>,
    pub username: Option<String>,
    pub namespace: Option<String>,
}

/// Payload for creating a coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCoupon {
    pub serial: String,
    pub code: String,
    #[serde(default)]
    pub kind: String,
    /// Wall-clock expiration on the coupon clock (see [`parse_expiration`]).
    #[serde(deserialize_with = "deserialize_expiration")]
    pub expiration: NaiveDateTime,
    #[serde(default)]
    pub region: String,
    pub amount: f32,
}

impl NewCoupon {
    /// Serial and code are case-insensitive; they are stored lowercased.
    pub fn normalized(mut self) -> Self {
        self.serial = self.serial.to_lowercase();
        self.code = self.code.to_lowercase();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCoupon {
    pub serial: String,
    pub code: String,
}

/// The columns redemption needs to decide what happens.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponState {
    pub amount: f32,
    pub expiration: NaiveDateTime,
    pub status: CouponStatus,
}

/// An attempt to redeem a coupon, as received from a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemRequest {
    pub serial: String,
    pub code: String,
    pub username: String,
    pub namespace: String,
    pub use_time: DateTime<Utc>,
}

/// The write applied to a coupon row when it is redeemed.
/// `serial`/`code` are lowercased and `use_time` is on the coupon clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    pub serial: String,
    pub code: String,
    pub username: String,
    pub namespace: String,
    pub use_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedeemResult {
    pub amount: f32,
}

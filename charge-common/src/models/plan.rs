// File: charge-common/src/models/plan.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the one live row for a given `plan_id`.
pub const PLAN_STATUS_ACTIVE: &str = "A";
/// Status left behind on soft-deleted (historical) rows.
pub const PLAN_STATUS_DEACTIVATED: &str = "N";

/// A plan row joined with its region, as returned by list/retrieve queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: i32,
    pub plan_id: String,
    pub plan_name: String,
    pub plan_type: String,
    pub plan_level: i32,
    pub specification1: String,
    pub specification2: String,
    pub price: f32,
    pub cycle: String,
    pub region: String,
    pub region_describe: String,
    #[serde(rename = "creation_time")]
    pub create_time: DateTime<Utc>,
    pub status: String,
}

impl Plan {
    pub fn is_active(&self) -> bool {
        self.status == PLAN_STATUS_ACTIVE
    }
}

/// Payload for creating a plan, or for replacing the active row of an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlan {
    /// Business key. Generated on create when absent; ignored on modify.
    #[serde(default)]
    pub plan_id: Option<String>,
    pub plan_name: String,
    pub plan_type: String,
    #[serde(default)]
    pub plan_level: i32,
    #[serde(default)]
    pub specification1: String,
    #[serde(default)]
    pub specification2: String,
    pub price: f32,
    pub cycle: String,
    /// Region code, resolved to the internal region id on insert.
    pub region: String,
}

/// Region reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Region {
    pub region: String,
    pub region_describe: String,
    pub identification: String,
}

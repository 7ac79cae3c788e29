// File: charge-core/src/repositories/postgres/plans.rs

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;
use charge_common::models::{FilterParam, NewPlan, Plan, PlanFilter, PlanSort, Region};
use charge_common::models::plan::{PLAN_STATUS_ACTIVE, PLAN_STATUS_DEACTIVATED};
use charge_common::traits::repository_traits::PlanRepository;
use crate::Error;
use super::conflict_or_database;

/// Plan columns joined with the region code/description.
const PLAN_SELECT: &str = r#"
    SELECT
        p.id,
        p.plan_id,
        p.plan_name,
        p.plan_type,
        p.plan_level,
        p.specification1,
        p.specification2,
        p.price,
        p.cycle,
        r.region,
        r.region_describe,
        p.create_time,
        p.status
    FROM plans p
    JOIN plan_regions r ON p.region_id = r.id
"#;

#[derive(Clone)]
pub struct PostgresPlanRepository {
    pool: Pool<Postgres>,
}

impl PostgresPlanRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_plan_by_row_id(&self, id: i32) -> Result<Option<Plan>, Error> {
        let sql = format!("{PLAN_SELECT} WHERE p.id = $1");
        let row_opt = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| plan_from_row(&r)).transpose()
    }

    /// Inserts an active row; returns its internal id.
    async fn insert_plan_row(
        conn: &mut PgConnection,
        plan_id: &str,
        plan: &NewPlan,
        region_id: i32,
    ) -> Result<i32, Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO plans (
                plan_id,
                plan_name,
                plan_type,
                plan_level,
                specification1,
                specification2,
                price,
                cycle,
                region_id,
                create_time,
                status
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,NOW(),$10)
            RETURNING id
            "#,
        )
            .bind(plan_id)
            .bind(&plan.plan_name)
            .bind(plan.plan_type.to_lowercase())
            .bind(plan.plan_level)
            .bind(&plan.specification1)
            .bind(&plan.specification2)
            .bind(plan.price)
            .bind(&plan.cycle)
            .bind(region_id)
            .bind(PLAN_STATUS_ACTIVE)
            .fetch_one(conn)
            .await
            .map_err(|e| conflict_or_database(e, format!("plan '{}' already has an active row", plan_id)))?;

        Ok(row.try_get("id")?)
    }
}

fn plan_from_row(r: &PgRow) -> Result<Plan, Error> {
    Ok(Plan {
        id: r.try_get("id")?,
        plan_id: r.try_get("plan_id")?,
        plan_name: r.try_get("plan_name")?,
        plan_type: r.try_get("plan_type")?,
        plan_level: r.try_get("plan_level")?,
        specification1: r.try_get("specification1")?,
        specification2: r.try_get("specification2")?,
        price: r.try_get("price")?,
        cycle: r.try_get("cycle")?,
        region: r.try_get("region")?,
        region_describe: r.try_get("region_describe")?,
        create_time: r.try_get("create_time")?,
        status: r.try_get("status")?,
    })
}

fn bind_filter<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    filter: &PlanFilter,
) -> Query<'q, Postgres, PgArguments> {
    for param in filter.params() {
        query = match param {
            FilterParam::Int(v) => query.bind(v),
            FilterParam::Text(v) => query.bind(v),
        };
    }
    query
}

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn lookup_region_id(&self, region: &str) -> Result<i32, Error> {
        let region = region.to_lowercase();
        let row_opt = sqlx::query("SELECT id FROM plan_regions WHERE region = $1")
            .bind(&region)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(r.try_get("id")?),
            None => Err(Error::NotFound(format!("region '{}'", region))),
        }
    }

    async fn list_plans(
        &self,
        filter: &PlanFilter,
        sort: &PlanSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Plan>, Error> {
        let next = filter.next_placeholder();
        let sql = format!(
            "{PLAN_SELECT} WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            filter.where_clause(),
            sort.to_sql(),
            next,
            next + 1,
        );
        debug!(">>> {}", sql);

        let rows = bind_filter(sqlx::query(&sql), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let mut list = Vec::with_capacity(rows.len());
        for r in rows {
            list.push(plan_from_row(&r)?);
        }
        Ok(list)
    }

    async fn count_plans(&self, filter: &PlanFilter) -> Result<i64, Error> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM plans p WHERE {}",
            filter.where_clause()
        );
        debug!(">>> {} params={:?}", sql, filter.params());

        let row = bind_filter(sqlx::query(&sql), filter)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn get_plan_by_id(&self, plan_id: &str) -> Result<Option<Plan>, Error> {
        let sql = format!("{PLAN_SELECT} WHERE p.plan_id = $1 AND p.status = $2 LIMIT 1");
        let row_opt = sqlx::query(&sql)
            .bind(plan_id)
            .bind(PLAN_STATUS_ACTIVE)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| plan_from_row(&r)).transpose()
    }

    async fn soft_delete_plan(&self, plan_id: &str) -> Result<(), Error> {
        let result = sqlx::query("UPDATE plans SET status = $1 WHERE plan_id = $2 AND status = $3")
            .bind(PLAN_STATUS_DEACTIVATED)
            .bind(plan_id)
            .bind(PLAN_STATUS_ACTIVE)
            .execute(&self.pool)
            .await?;

        debug!("soft delete plan '{}': {} row(s)", plan_id, result.rows_affected());
        Ok(())
    }

    async fn list_regions(&self) -> Result<Vec<Region>, Error> {
        let rows = sqlx::query(
            "SELECT region, region_describe, identification FROM plan_regions ORDER BY id",
        )
            .fetch_all(&self.pool)
            .await?;

        let mut regions = Vec::with_capacity(rows.len());
        for r in rows {
            regions.push(Region {
                region: r.try_get("region")?,
                region_describe: r.try_get("region_describe")?,
                identification: r.try_get("identification")?,
            });
        }
        Ok(regions)
    }

    async fn create_plan(&self, plan: &NewPlan) -> Result<Plan, Error> {
        let region_id = self.lookup_region_id(&plan.region).await?;
        let plan_id = plan
            .plan_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut conn = self.pool.acquire().await?;
        let id = Self::insert_plan_row(&mut conn, &plan_id, plan, region_id).await?;
        info!("created plan '{}' (row {})", plan_id, id);

        self.get_plan_by_row_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("plan row {}", id)))
    }

    async fn modify_plan(&self, plan_id: &str, plan: &NewPlan) -> Result<Plan, Error> {
        let region_id = self.lookup_region_id(&plan.region).await?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE plans SET status = $1 WHERE plan_id = $2 AND status = $3")
            .bind(PLAN_STATUS_DEACTIVATED)
            .bind(plan_id)
            .bind(PLAN_STATUS_ACTIVE)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("plan '{}'", plan_id)));
        }

        let id = Self::insert_plan_row(&mut tx, plan_id, plan, region_id).await?;
        tx.commit().await?;
        info!("modified plan '{}' (new row {})", plan_id, id);

        self.get_plan_by_row_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("plan row {}", id)))
    }
}

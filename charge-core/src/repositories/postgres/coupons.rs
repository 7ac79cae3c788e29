// File: charge-core/src/repositories/postgres/coupons.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use charge_common::models::{Coupon, CouponState, CouponStatus, NewCoupon, Redemption};
use charge_common::traits::repository_traits::CouponRepository;
use crate::Error;
use super::conflict_or_database;

#[derive(Clone)]
pub struct PostgresCouponRepository {
    pool: Pool<Postgres>,
}

impl PostgresCouponRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponRepository for PostgresCouponRepository {
    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO coupons (
                serial,
                code,
                kind,
                expiration,
                region,
                amount,
                status
            )
            VALUES ($1,$2,$3,$4,$5,$6,'available')
            "#,
        )
            .bind(&coupon.serial)
            .bind(&coupon.code)
            .bind(&coupon.kind)
            .bind(coupon.expiration)
            .bind(&coupon.region)
            .bind(coupon.amount)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                conflict_or_database(
                    e,
                    format!("coupon serial='{}' code='{}' already exists", coupon.serial, coupon.code),
                )
            })?;

        Ok(())
    }

    async fn get_coupon(&self, serial: &str, code: &str) -> Result<Option<Coupon>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                id,
                serial,
                code,
                kind,
                expiration,
                region,
                amount,
                status,
                use_time,
                username,
                namespace
            FROM coupons
            WHERE serial = $1 AND code = $2
            "#,
        )
            .bind(serial)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row_opt {
            let status: String = r.try_get("status")?;
            Ok(Some(Coupon {
                id: r.try_get("id")?,
                serial: r.try_get("serial")?,
                code: r.try_get("code")?,
                kind: r.try_get("kind")?,
                expiration: r.try_get("expiration")?,
                region: r.try_get("region")?,
                amount: r.try_get("amount")?,
                status: CouponStatus::from(status),
                use_time: r.try_get("use_time")?,
                username: r.try_get("username")?,
                namespace: r.try_get("namespace")?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn fetch_redeem_state(&self, serial: &str, code: &str) -> Result<Option<CouponState>, Error> {
        debug!(">>> fetch redeem state serial={} code={}", serial, code);
        let row_opt = sqlx::query(
            "SELECT amount, expiration, status FROM coupons WHERE serial = $1 AND code = $2",
        )
            .bind(serial)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row_opt {
            let status: String = r.try_get("status")?;
            Ok(Some(CouponState {
                amount: r.try_get("amount")?,
                expiration: r.try_get("expiration")?,
                status: CouponStatus::from(status),
            }))
        } else {
            Ok(None)
        }
    }

    async fn mark_expired(&self, serial: &str, code: &str) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET status = 'expired'
            WHERE serial = $1 AND code = $2 AND status = 'available'
            "#,
        )
            .bind(serial)
            .bind(code)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_used(&self, redemption: &Redemption) -> Result<bool, Error> {
        // Conditional on the row still being available: two concurrent
        // redemptions can both read `available`, only one may win here.
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET
              use_time = $1,
              username = $2,
              namespace = $3,
              status = 'used'
            WHERE serial = $4 AND code = $5 AND status = 'available'
            "#,
        )
            .bind(redemption.use_time)
            .bind(&redemption.username)
            .bind(&redemption.namespace)
            .bind(&redemption.serial)
            .bind(&redemption.code)
            .execute(&self.pool)
            .await?;

        debug!(
            "mark used serial={} code={}: {} row(s)",
            redemption.serial,
            redemption.code,
            result.rows_affected()
        );
        Ok(result.rows_affected() == 1)
    }
}

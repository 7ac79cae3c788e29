// File: charge-core/src/test_utils/helpers.rs

use sqlx::{Pool, Postgres};
use sqlx::postgres::PgPoolOptions;
use tracing::warn;
use crate::Error;
use crate::db::Database;

/// Env var naming the Postgres database used by integration tests.
pub const TEST_DATABASE_URL: &str = "TEST_DATABASE_URL";

/// Create a connection pool to the test DB named by `TEST_DATABASE_URL`.
/// Returns `None` when the variable is unset.
pub async fn create_test_db_pool() -> Result<Option<Pool<Postgres>>, Error> {
    let url = match std::env::var(TEST_DATABASE_URL) {
        Ok(url) if !url.trim().is_empty() => url,
        _ => return Ok(None),
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    Ok(Some(pool))
}

/// Wipes out test data so each test can start fresh.
pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query(r#"
        TRUNCATE TABLE
            coupons,
            plans,
            plan_regions
        RESTART IDENTITY CASCADE;
    "#)
        .execute(pool)
        .await?;

    Ok(())
}

/// Returns a migrated, empty test DB handle, or `None` (after logging) when
/// no test database is configured so the caller can skip.
pub async fn setup_test_database() -> Result<Option<Database>, Error> {
    let Some(pool) = create_test_db_pool().await? else {
        warn!("{} not set; skipping database test", TEST_DATABASE_URL);
        return Ok(None);
    };
    let db = Database::from_pool(pool);
    db.migrate().await?;
    clean_database(db.pool()).await?;

    Ok(Some(db))
}

/// Inserts a region row and returns its id.
pub async fn seed_region(
    pool: &Pool<Postgres>,
    code: &str,
    describe: &str,
    identification: &str,
) -> Result<i32, Error> {
    let id: i32 = sqlx::query_scalar(
        r#"INSERT INTO plan_regions (region, region_describe, identification)
           VALUES ($1, $2, $3)
           RETURNING id"#,
    )
        .bind(code.to_lowercase())
        .bind(describe)
        .bind(identification)
        .fetch_one(pool)
        .await?;

    Ok(id)
}

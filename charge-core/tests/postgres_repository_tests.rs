// File: charge-core/tests/postgres_repository_tests.rs
//
// Runs against the database named by TEST_DATABASE_URL; every test returns
// early when it is unset. Tests share one database, so they take DB_LOCK.

use std::sync::{Arc, LazyLock};
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use charge_common::models::coupon::coupon_clock;
use charge_common::models::{CouponStatus, NewCoupon, NewPlan, RedeemRequest};
use charge_core::repositories::{
    CouponRepository, PlanRepository, PostgresCouponRepository, PostgresPlanRepository,
};
use charge_core::services::{CouponService, PlanQuery, PlanService};
use charge_core::test_utils::helpers::*;
use charge_core::Error;

static DB_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn new_plan(name: &str, plan_type: &str, region: &str) -> NewPlan {
    NewPlan {
        plan_id: None,
        plan_name: name.into(),
        plan_type: plan_type.into(),
        plan_level: 2,
        specification1: "spec one".into(),
        specification2: "spec two".into(),
        price: 12.5,
        cycle: "m".into(),
        region: region.into(),
    }
}

fn new_coupon(serial: &str, code: &str, hours: i64) -> NewCoupon {
    NewCoupon {
        serial: serial.into(),
        code: code.into(),
        kind: "recharge".into(),
        expiration: coupon_clock(Utc::now()) + Duration::hours(hours),
        region: "cn-north-1".into(),
        amount: 50.0,
    }
}

fn redeem(serial: &str, code: &str, username: &str) -> RedeemRequest {
    RedeemRequest {
        serial: serial.into(),
        code: code.into(),
        username: username.into(),
        namespace: "team-a".into(),
        use_time: Utc::now(),
    }
}

#[tokio::test]
async fn test_plan_repository_round_trip() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(db) = setup_test_database().await? else { return Ok(()) };
    seed_region(db.pool(), "cn-north-1", "Beijing", "bj").await?;
    seed_region(db.pool(), "cn-south-1", "Guangzhou", "gz").await?;

    let repo = PostgresPlanRepository::new(db.pool().clone());

    let created = repo.create_plan(&new_plan("basic", "Container", "CN-NORTH-1")).await?;
    assert_eq!(created.plan_type, "container");
    assert_eq!(created.region, "cn-north-1");
    assert_eq!(created.region_describe, "Beijing");
    assert!(created.is_active());

    let fetched = repo.get_plan_by_id(&created.plan_id).await?.expect("plan should exist");
    assert_eq!(fetched, created);

    // Modify keeps the business key and leaves a deactivated history row.
    let modified = repo
        .modify_plan(&created.plan_id, &new_plan("basic v2", "container", "cn-south-1"))
        .await?;
    assert_eq!(modified.plan_id, created.plan_id);
    assert_ne!(modified.id, created.id);
    let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plans WHERE plan_id = $1")
        .bind(&created.plan_id)
        .fetch_one(db.pool())
        .await?;
    assert_eq!(history, 2);

    repo.soft_delete_plan(&created.plan_id).await?;
    assert!(repo.get_plan_by_id(&created.plan_id).await?.is_none());
    // Nothing active left: still fine.
    repo.soft_delete_plan(&created.plan_id).await?;

    let err = repo.modify_plan(&created.plan_id, &new_plan("x", "y", "cn-north-1")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let regions = repo.list_regions().await?;
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].identification, "bj");

    let err = repo.lookup_region_id("US").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_active_plan_id_conflicts() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(db) = setup_test_database().await? else { return Ok(()) };
    seed_region(db.pool(), "cn-north-1", "Beijing", "bj").await?;
    let repo = PostgresPlanRepository::new(db.pool().clone());

    let mut plan = new_plan("fixed", "volume", "cn-north-1");
    plan.plan_id = Some("plan-fixed".into());
    repo.create_plan(&plan).await?;
    let err = repo.create_plan(&plan).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn test_count_matches_pages() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(db) = setup_test_database().await? else { return Ok(()) };
    seed_region(db.pool(), "cn-north-1", "Beijing", "bj").await?;
    seed_region(db.pool(), "cn-south-1", "Guangzhou", "gz").await?;

    let repo = Arc::new(PostgresPlanRepository::new(db.pool().clone()));
    let service = PlanService::new(repo.clone());
    for i in 0..6 {
        service.create_plan(&new_plan(&format!("n{i}"), "container", "cn-north-1")).await?;
    }
    for i in 0..4 {
        service.create_plan(&new_plan(&format!("s{i}"), "volume", "cn-south-1")).await?;
    }
    let gone = service.create_plan(&new_plan("gone", "volume", "cn-south-1")).await?;
    service.delete_plan(&gone.plan_id).await?;

    for (region, plan_type, expected) in [
        ("", "", 10),
        ("cn-north-1", "", 6),
        ("cn-south-1", "volume", 4),
        ("", "container", 6),
        ("cn-north-1", "volume", 0),
    ] {
        let mut seen = 0;
        let mut offset = 0;
        loop {
            let page = service
                .query_plans(&PlanQuery {
                    region: region.into(),
                    plan_type: plan_type.into(),
                    order_by: "createtime".into(),
                    sort_order: "asc".into(),
                    offset,
                    limit: 4,
                })
                .await?;
            assert_eq!(page.total, expected, "{region}/{plan_type}");
            if page.results.is_empty() || offset >= page.total {
                break;
            }
            seen += page.results.len() as i64;
            offset += 4;
        }
        assert_eq!(seen, expected, "{region}/{plan_type}");
    }

    let err = service
        .query_plans(&PlanQuery { region: "US".into(), ..PlanQuery::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_coupon_create_and_redeem() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(db) = setup_test_database().await? else { return Ok(()) };
    let repo = Arc::new(PostgresCouponRepository::new(db.pool().clone()));
    let service = CouponService::new(repo.clone());

    let created = service.create_coupon(new_coupon("abc", "XYZ", 1)).await?;
    assert_eq!((created.serial.as_str(), created.code.as_str()), ("abc", "xyz"));

    let err = service.create_coupon(new_coupon("ABC", "xyz", 1)).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let result = service.redeem_coupon(redeem("abc", "xyz", "alice")).await?;
    assert_eq!(result.amount, 50.0);

    let stored = repo.get_coupon("abc", "xyz").await?.expect("coupon should exist");
    assert_eq!(stored.status, CouponStatus::Used);
    assert_eq!(stored.username.as_deref(), Some("alice"));

    let err = service.redeem_coupon(redeem("abc", "xyz", "bob")).await.unwrap_err();
    assert!(matches!(err, Error::CouponUsed));
    Ok(())
}

#[tokio::test]
async fn test_expired_coupon() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(db) = setup_test_database().await? else { return Ok(()) };
    let repo = Arc::new(PostgresCouponRepository::new(db.pool().clone()));
    let service = CouponService::new(repo.clone());

    service.create_coupon(new_coupon("old", "one", -1)).await?;
    let err = service.redeem_coupon(redeem("old", "one", "alice")).await.unwrap_err();
    assert!(matches!(err, Error::CouponExpired));

    let stored = repo.get_coupon("old", "one").await?.expect("coupon should exist");
    assert_eq!(stored.status, CouponStatus::Expired);

    let err = service.redeem_coupon(redeem("old", "one", "alice")).await.unwrap_err();
    assert!(matches!(err, Error::CouponExpired));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_redemption_single_winner() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(db) = setup_test_database().await? else { return Ok(()) };
    let service = Arc::new(CouponService::new(Arc::new(PostgresCouponRepository::new(
        db.pool().clone(),
    ))));
    service.create_coupon(new_coupon("race", "one", 1)).await?;

    let attempts = (0..10).map(|i| {
        let service = service.clone();
        async move { service.redeem_coupon(redeem("race", "one", &format!("user-{i}"))).await }
    });
    let results = futures_util::future::join_all(attempts).await;

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for r in results.into_iter().filter_map(Result::err) {
        assert!(matches!(r, Error::CouponUsed), "unexpected error: {r}");
    }
    Ok(())
}

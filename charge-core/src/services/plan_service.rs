use std::sync::Arc;
use serde::Serialize;
use tracing::{debug, info};

use charge_common::models::{NewPlan, Plan, PlanSort, Region, SortOrder};
use charge_common::traits::repository_traits::PlanRepository;
use crate::query::{build_plan_filter, clamp_window};
use crate::Error;

/// Inputs of a plan list request. Empty strings mean "not specified".
#[derive(Debug, Clone, Default)]
pub struct PlanQuery {
    pub region: String,
    pub plan_type: String,
    pub order_by: String,
    pub sort_order: String,
    pub offset: i64,
    pub limit: i64,
}

/// One page of plans plus the total matching the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanPage {
    pub total: i64,
    pub results: Vec<Plan>,
}

pub struct PlanService {
    repo: Arc<dyn PlanRepository>,
}

impl PlanService {
    pub fn new(repo: Arc<dyn PlanRepository>) -> Self {
        Self { repo }
    }

    pub async fn query_plans(&self, query: &PlanQuery) -> Result<PlanPage, Error> {
        let filter = build_plan_filter(self.repo.as_ref(), &query.region, &query.plan_type).await?;
        let sort = PlanSort::new(&query.order_by, &query.sort_order, SortOrder::Desc);

        let total = self.repo.count_plans(&filter).await?;
        debug!("count: {}", total);
        if total == 0 {
            return Ok(PlanPage { total: 0, results: Vec::new() });
        }

        let (mut offset, mut limit) = (query.offset, query.limit);
        clamp_window(total, &mut offset, &mut limit);

        let results = self.repo.list_plans(&filter, &sort, limit, offset).await?;
        Ok(PlanPage { total, results })
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Plan, Error> {
        self.repo
            .get_plan_by_id(plan_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("plan '{}'", plan_id)))
    }

    pub async fn delete_plan(&self, plan_id: &str) -> Result<(), Error> {
        info!("deleting plan '{}'", plan_id);
        self.repo.soft_delete_plan(plan_id).await
    }

    pub async fn create_plan(&self, plan: &NewPlan) -> Result<Plan, Error> {
        validate_plan(plan)?;
        self.repo.create_plan(plan).await
    }

    pub async fn modify_plan(&self, plan_id: &str, plan: &NewPlan) -> Result<Plan, Error> {
        validate_plan(plan)?;
        self.repo.modify_plan(plan_id, plan).await
    }

    pub async fn list_regions(&self) -> Result<Vec<Region>, Error> {
        self.repo.list_regions().await
    }
}

fn validate_plan(plan: &NewPlan) -> Result<(), Error> {
    if plan.plan_name.trim().is_empty() {
        return Err(Error::Validation("plan_name is required".into()));
    }
    if plan.plan_type.trim().is_empty() {
        return Err(Error::Validation("plan_type is required".into()));
    }
    if plan.region.trim().is_empty() {
        return Err(Error::Validation("region is required".into()));
    }
    if plan.price < 0.0 {
        return Err(Error::Validation("price must not be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory::InMemoryPlanRepository;

    fn new_plan(name: &str, plan_type: &str, region: &str) -> NewPlan {
        NewPlan {
            plan_id: None,
            plan_name: name.into(),
            plan_type: plan_type.into(),
            plan_level: 1,
            specification1: "2 cores".into(),
            specification2: "4 GB".into(),
            price: 10.0,
            cycle: "m".into(),
            region: region.into(),
        }
    }

    async fn seeded() -> Result<(Arc<InMemoryPlanRepository>, PlanService), Error> {
        let repo = Arc::new(InMemoryPlanRepository::new());
        repo.seed_region("cn-north-1", "Beijing", "bj").await;
        repo.seed_region("cn-south-1", "Guangzhou", "gz").await;
        let service = PlanService::new(repo.clone());

        for i in 0..7 {
            service.create_plan(&new_plan(&format!("c{i}"), "container", "cn-north-1")).await?;
        }
        for i in 0..3 {
            service.create_plan(&new_plan(&format!("v{i}"), "Volume", "cn-north-1")).await?;
        }
        for i in 0..4 {
            service.create_plan(&new_plan(&format!("s{i}"), "container", "cn-south-1")).await?;
        }
        Ok((repo, service))
    }

    fn query(region: &str, plan_type: &str, offset: i64, limit: i64) -> PlanQuery {
        PlanQuery {
            region: region.into(),
            plan_type: plan_type.into(),
            offset,
            limit,
            ..PlanQuery::default()
        }
    }

    #[tokio::test]
    async fn pages_add_up_to_count() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;

        for (region, plan_type, expected) in [
            ("", "", 14),
            ("cn-north-1", "", 10),
            ("cn-north-1", "container", 7),
            ("", "volume", 3),
            ("CN-SOUTH-1", "CONTAINER", 4),
            ("cn-south-1", "volume", 0),
        ] {
            let mut seen = 0;
            let mut offset = 0;
            loop {
                let page = service.query_plans(&query(region, plan_type, offset, 3)).await?;
                assert_eq!(page.total, expected, "{region}/{plan_type}");
                if page.results.is_empty() || offset >= page.total {
                    break;
                }
                seen += page.results.len() as i64;
                offset += 3;
            }
            assert_eq!(seen, expected, "{region}/{plan_type}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn empty_result_short_circuits() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let page = service.query_plans(&query("cn-south-1", "volume", 5, 10)).await?;
        assert_eq!(page, PlanPage { total: 0, results: vec![] });
        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_offset_returns_last_page() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let page = service.query_plans(&query("cn-north-1", "container", 100, 3)).await?;
        assert_eq!(page.total, 7);
        assert_eq!(page.results.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_region_is_not_found_not_empty() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let err = service.query_plans(&query("US", "", 0, 10)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn hotness_ordering() -> Result<(), Error> {
        let (repo, service) = seeded().await?;
        let page = service.query_plans(&query("cn-south-1", "", 0, 10)).await?;
        let ids: Vec<String> = page.results.iter().map(|p| p.plan_id.clone()).collect();
        for (i, id) in ids.iter().enumerate() {
            repo.set_hotness(id, i as i32).await;
        }

        let mut q = query("cn-south-1", "", 0, 10);
        q.order_by = "hotness".into();
        q.sort_order = "asc".into();
        let asc = service.query_plans(&q).await?;
        let asc_ids: Vec<String> = asc.results.iter().map(|p| p.plan_id.clone()).collect();
        assert_eq!(asc_ids, ids);

        q.sort_order = "DESC".into();
        let desc = service.query_plans(&q).await?;
        let mut desc_ids: Vec<String> = desc.results.iter().map(|p| p.plan_id.clone()).collect();
        desc_ids.reverse();
        assert_eq!(desc_ids, ids);
        Ok(())
    }

    #[tokio::test]
    async fn soft_delete_hides_plan_and_is_idempotent() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let plan = service.create_plan(&new_plan("gone", "volume", "cn-south-1")).await?;
        assert!(plan.is_active());

        service.delete_plan(&plan.plan_id).await?;
        assert!(matches!(service.get_plan(&plan.plan_id).await, Err(Error::NotFound(_))));
        service.delete_plan(&plan.plan_id).await?;
        service.delete_plan("never-existed").await?;

        let page = service.query_plans(&query("cn-south-1", "volume", 0, 10)).await?;
        assert_eq!(page.total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn modify_replaces_active_row() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let plan = service.create_plan(&new_plan("old", "volume", "cn-south-1")).await?;

        let mut changed = new_plan("new", "volume", "cn-north-1");
        changed.price = 99.0;
        let modified = service.modify_plan(&plan.plan_id, &changed).await?;
        assert_eq!(modified.plan_id, plan.plan_id);
        assert_ne!(modified.id, plan.id);
        assert_eq!(modified.region, "cn-north-1");

        let current = service.get_plan(&plan.plan_id).await?;
        assert_eq!(current.plan_name, "new");
        assert_eq!(current.price, 99.0);

        let err = service.modify_plan("missing", &changed).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn create_with_existing_active_id_conflicts() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let mut plan = new_plan("dup", "volume", "cn-south-1");
        plan.plan_id = Some("fixed-id".into());
        service.create_plan(&plan).await?;

        let err = service.create_plan(&plan).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn create_validates_input() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let err = service.create_plan(&new_plan("", "volume", "cn-south-1")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service.create_plan(&new_plan("x", "volume", "mars")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn regions_are_listed() -> Result<(), Error> {
        let (_repo, service) = seeded().await?;
        let regions = service.list_regions().await?;
        let codes: Vec<&str> = regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(codes, vec!["cn-north-1", "cn-south-1"]);
        Ok(())
    }
}

use tracing::debug;
use charge_common::models::PlanFilter;
use charge_common::traits::repository_traits::PlanRepository;
use crate::Error;

/// Builds the active-plan filter from optional region and type inputs.
///
/// An empty string means "not specified". A region code is resolved to its
/// internal id first so the predicate stays on the plans table, and an
/// unknown code fails with `NotFound` instead of matching nothing.
pub async fn build_plan_filter(
    repo: &dyn PlanRepository,
    region: &str,
    plan_type: &str,
) -> Result<PlanFilter, Error> {
    let mut filter = PlanFilter::active();

    let region = region.trim().to_lowercase();
    if !region.is_empty() {
        let region_id = repo.lookup_region_id(&region).await?;
        debug!("region '{}' resolved to id {}", region, region_id);
        filter = filter.with_region_id(region_id);
    }

    let plan_type = plan_type.trim();
    if !plan_type.is_empty() {
        filter = filter.with_plan_type(plan_type);
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use charge_common::models::FilterParam;
    use crate::test_utils::memory::InMemoryPlanRepository;

    #[tokio::test]
    async fn empty_inputs_give_active_only() -> Result<(), Error> {
        let repo = InMemoryPlanRepository::new();
        let filter = build_plan_filter(&repo, "", "").await?;
        assert_eq!(filter, PlanFilter::active());
        Ok(())
    }

    #[tokio::test]
    async fn region_is_resolved_case_insensitively() -> Result<(), Error> {
        let repo = InMemoryPlanRepository::new();
        let id = repo.seed_region("cn-north-1", "Beijing", "bj").await;

        let filter = build_plan_filter(&repo, "CN-North-1", "Container").await?;
        assert_eq!(filter.region_id(), Some(id));
        assert_eq!(
            filter.params(),
            vec![FilterParam::Int(id), FilterParam::Text("container".into())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_region_is_not_found() {
        let repo = InMemoryPlanRepository::new();
        repo.seed_region("cn-north-1", "Beijing", "bj").await;

        let err = build_plan_filter(&repo, "US", "").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

// File: charge-common/src/models/query.rs
//
// Filter and ordering for plan list queries. Everything that ends up in SQL
// text here is a static identifier; caller values only travel as parameters.

use crate::models::plan::PLAN_STATUS_ACTIVE;

/// A bound value for a placeholder in [`PlanFilter::where_clause`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterParam {
    Int(i32),
    Text(String),
}

/// Predicate over the plans table (aliased `p`). Always restricted to active rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanFilter {
    region_id: Option<i32>,
    plan_type: Option<String>,
}

impl PlanFilter {
    /// Active plans, no further restriction.
    pub fn active() -> Self {
        Self::default()
    }

    pub fn with_region_id(mut self, region_id: i32) -> Self {
        self.region_id = Some(region_id);
        self
    }

    /// Plan types are compared lowercased.
    pub fn with_plan_type(mut self, plan_type: &str) -> Self {
        self.plan_type = Some(plan_type.to_lowercase());
        self
    }

    pub fn region_id(&self) -> Option<i32> {
        self.region_id
    }

    pub fn plan_type(&self) -> Option<&str> {
        self.plan_type.as_deref()
    }

    /// WHERE fragment (without the keyword) using `$1..$n` placeholders.
    pub fn where_clause(&self) -> String {
        let mut clause = format!("p.status = '{}'", PLAN_STATUS_ACTIVE);
        let mut n = 0;
        if self.region_id.is_some() {
            n += 1;
            clause.push_str(&format!(" AND p.region_id = ${}", n));
        }
        if self.plan_type.is_some() {
            n += 1;
            clause.push_str(&format!(" AND p.plan_type = ${}", n));
        }
        clause
    }

    /// Parameters in placeholder order.
    pub fn params(&self) -> Vec<FilterParam> {
        let mut params = Vec::with_capacity(2);
        if let Some(id) = self.region_id {
            params.push(FilterParam::Int(id));
        }
        if let Some(t) = &self.plan_type {
            params.push(FilterParam::Text(t.clone()));
        }
        params
    }

    /// Index of the first placeholder free for LIMIT/OFFSET.
    pub fn next_placeholder(&self) -> usize {
        self.params().len() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Accepts only `asc`/`desc` (any case); everything else yields `default`.
    pub fn parse(text: &str, default: SortOrder) -> SortOrder {
        match text.to_lowercase().as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => default,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Columns plans may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreateTime,
    Hotness,
}

impl SortField {
    /// `createtime` and `hotness` are the only accepted names.
    pub fn parse(order_by: &str) -> Option<SortField> {
        match order_by.to_lowercase().as_str() {
            "createtime" => Some(SortField::CreateTime),
            "hotness" => Some(SortField::Hotness),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreateTime => "p.create_time",
            SortField::Hotness => "p.hotness",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for PlanSort {
    fn default() -> Self {
        Self { field: SortField::CreateTime, order: SortOrder::Desc }
    }
}

impl PlanSort {
    /// An unrecognised `order_by` falls back to newest-first, whatever the
    /// requested direction.
    pub fn new(order_by: &str, sort_order: &str, default_order: SortOrder) -> Self {
        match SortField::parse(order_by) {
            Some(field) => Self { field, order: SortOrder::parse(sort_order, default_order) },
            None => Self::default(),
        }
    }

    pub fn to_sql(&self) -> String {
        format!("{} {}", self.field.column(), self.order.as_sql())
    }
}

use std::sync::Arc;

use crate::plan::{LogicalPlan, PlanId};

/// One entry known to the catalog: a table, a view, or a cached plan.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Qualified name for tables and views; `None` for anonymous cache entries.
    pub name: Option<String>,
    pub plan: LogicalPlan,
    /// The root of `plan` is a materialization boundary.
    pub cached: bool,
}

impl Artifact {
    pub fn named(name: &str, plan: LogicalPlan) -> Self {
        Self { name: Some(name.to_string()), plan, cached: false }
    }

    pub fn cached_named(name: &str, plan: LogicalPlan) -> Self {
        Self { name: Some(name.to_string()), plan, cached: true }
    }

    pub fn cached(plan: LogicalPlan) -> Self {
        Self { name: None, plan, cached: true }
    }

    pub fn root_id(&self) -> PlanId {
        self.plan.id
    }

    pub fn same_root(&self, plan: &LogicalPlan) -> bool {
        Arc::ptr_eq(&self.plan, plan)
    }
}

/// Immutable view of the catalog taken at render time.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    artifacts: Vec<Artifact>,
}

impl CatalogSnapshot {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self { artifacts }
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }
}

impl From<Vec<Artifact>> for CatalogSnapshot {
    fn from(artifacts: Vec<Artifact>) -> Self {
        Self::new(artifacts)
    }
}

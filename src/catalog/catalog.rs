use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    catalog::{Artifact, CatalogSnapshot},
    graph::{LineageError, LineageResult},
    plan::{is_generated_label, IdManager, LogicalPlan, PlanBuilder},
};

pub type Catalog = Arc<RwLock<InternalCatalog>>;

/// In-memory registry of tables, views and cached plans.
#[derive(Debug, Default)]
pub struct InternalCatalog {
    ids: Arc<IdManager>,
    /// keyed by lowercase name, in registration order
    entries: IndexMap<String, Artifact>,
    anonymous_cache: Vec<Artifact>,
}

impl InternalCatalog {
    pub fn into_protected(self) -> Catalog {
        Arc::new(RwLock::new(self))
    }

    fn new_catalog() -> Self {
        Self::with_ids(IdManager::new())
    }

    fn with_ids(ids: IdManager) -> Self {
        Self {
            ids: Arc::new(ids),
            entries: IndexMap::new(),
            anonymous_cache: Vec::new(),
        }
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn register(&mut self, artifact: Artifact, replace: bool) -> LineageResult<LogicalPlan> {
        let name = artifact.name.clone()
            .ok_or_else(|| LineageError::structural("named artifact without a name"))?;
        if is_generated_label(&name) {
            return LineageError::ReservedName(name).err();
        }
        let key = Self::key(&name);
        if !replace && self.entries.contains_key(&key) {
            return LineageError::DuplicateArtifact(name).err();
        }
        debug!(name = %name, root = %artifact.root_id(), cached = artifact.cached, "registered artifact");
        let plan = Arc::clone(&artifact.plan);
        // replacing keeps the original registration slot
        self.entries.insert(key, artifact);
        Ok(plan)
    }

    pub fn create_table(&mut self, name: &str, columns: &[&str]) -> LineageResult<LogicalPlan> {
        let plan = PlanBuilder::scan(&self.ids, name, columns).build();
        self.register(Artifact::named(name, plan), false)
    }

    pub fn create_temp_view(&mut self, name: &str, plan: PlanBuilder, replace: bool) -> LineageResult<LogicalPlan> {
        let plan = plan.view(name).build();
        self.register(Artifact::named(name, plan), replace)
    }

    pub fn cache_table(&mut self, name: &str, plan: PlanBuilder) -> LineageResult<LogicalPlan> {
        let plan = plan.view(name).build();
        self.register(Artifact::cached_named(name, plan), false)
    }

    /// Mark an existing plan fragment as materialized without naming it.
    pub fn cache(&mut self, plan: &LogicalPlan) {
        let known = self.anonymous_cache.iter().any(|a| a.same_root(plan));
        if !known {
            debug!(root = %plan.id, "cached anonymous plan");
            self.anonymous_cache.push(Artifact::cached(Arc::clone(plan)));
        }
    }

    pub fn get(&self, name: &str) -> Option<LogicalPlan> {
        self.entries.get(&Self::key(name)).map(|a| Arc::clone(&a.plan))
    }

    pub fn list_artifacts(&self) -> Vec<String> {
        self.entries.values().filter_map(|a| a.name.clone()).collect()
    }

    pub fn drop_artifact(&mut self, name: &str) -> bool {
        self.entries.shift_remove(&Self::key(name)).is_some()
    }

    pub fn uncache(&mut self, plan: &LogicalPlan) -> bool {
        let before = self.anonymous_cache.len();
        self.anonymous_cache.retain(|a| !a.same_root(plan));
        before != self.anonymous_cache.len()
    }

    /// Named entries in registration order, then anonymous cache entries.
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.entries.values()
            .chain(self.anonymous_cache.iter())
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }
}

pub trait CatalogCommon {
    fn new_catalog() -> Self;
    fn new_catalog_with_ids(ids: IdManager) -> Self;
    fn ids(&self) -> Arc<IdManager>;
    fn local_relation(&self, columns: &[&str]) -> PlanBuilder;
    fn range(&self, start: i64, end: i64) -> PlanBuilder;
    fn create_table(&self, name: &str, columns: &[&str]) -> LineageResult<LogicalPlan>;
    /// Names of the form `<Kind>_<digits>` (e.g. `Project_5`) are rejected
    /// with `ReservedName`, since anonymous nodes are labeled that way.
    fn create_temp_view(&self, name: &str, plan: PlanBuilder) -> LineageResult<LogicalPlan>;
    fn create_or_replace_temp_view(&self, name: &str, plan: PlanBuilder) -> LineageResult<LogicalPlan>;
    fn cache_table(&self, name: &str, plan: PlanBuilder) -> LineageResult<LogicalPlan>;
    fn cache(&self, plan: &LogicalPlan);
    fn uncache(&self, plan: &LogicalPlan) -> bool;
    fn table(&self, name: &str) -> LineageResult<PlanBuilder>;
    fn get(&self, name: &str) -> Option<LogicalPlan>;
    fn list_artifacts(&self) -> Vec<String>;
    fn drop_artifact(&self, name: &str) -> bool;
    fn snapshot(&self) -> CatalogSnapshot;
}

impl CatalogCommon for Catalog {

    fn new_catalog() -> Self {
        InternalCatalog::new_catalog().into_protected()
    }

    fn new_catalog_with_ids(ids: IdManager) -> Self {
        InternalCatalog::with_ids(ids).into_protected()
    }

    fn ids(&self) -> Arc<IdManager> {
        Arc::clone(&self.read().unwrap_or_else(PoisonError::into_inner).ids)
    }

    fn local_relation(&self, columns: &[&str]) -> PlanBuilder {
        PlanBuilder::local_relation(&self.ids(), columns)
    }

    fn range(&self, start: i64, end: i64) -> PlanBuilder {
        PlanBuilder::range(&self.ids(), start, end)
    }

    fn create_table(&self, name: &str, columns: &[&str]) -> LineageResult<LogicalPlan> {
        self.write().unwrap_or_else(PoisonError::into_inner).create_table(name, columns)
    }

    fn create_temp_view(&self, name: &str, plan: PlanBuilder) -> LineageResult<LogicalPlan> {
        self.write().unwrap_or_else(PoisonError::into_inner).create_temp_view(name, plan, false)
    }

    fn create_or_replace_temp_view(&self, name: &str, plan: PlanBuilder) -> LineageResult<LogicalPlan> {
        self.write().unwrap_or_else(PoisonError::into_inner).create_temp_view(name, plan, true)
    }

    fn cache_table(&self, name: &str, plan: PlanBuilder) -> LineageResult<LogicalPlan> {
        self.write().unwrap_or_else(PoisonError::into_inner).cache_table(name, plan)
    }

    fn cache(&self, plan: &LogicalPlan) {
        self.write().unwrap_or_else(PoisonError::into_inner).cache(plan)
    }

    fn uncache(&self, plan: &LogicalPlan) -> bool {
        self.write().unwrap_or_else(PoisonError::into_inner).uncache(plan)
    }

    /// Continue building on top of a registered table or view.
    fn table(&self, name: &str) -> LineageResult<PlanBuilder> {
        let plan = self.get(name).ok_or_else(|| LineageError::UnknownArtifact(name.to_string()))?;
        Ok(PlanBuilder::from_plan(&self.ids(), plan))
    }

    fn get(&self, name: &str) -> Option<LogicalPlan> {
        self.read().unwrap_or_else(PoisonError::into_inner).get(name)
    }

    fn list_artifacts(&self) -> Vec<String> {
        self.read().unwrap_or_else(PoisonError::into_inner).list_artifacts()
    }

    fn drop_artifact(&self, name: &str) -> bool {
        self.write().unwrap_or_else(PoisonError::into_inner).drop_artifact(name)
    }

    fn snapshot(&self) -> CatalogSnapshot {
        self.read().unwrap_or_else(PoisonError::into_inner).snapshot()
    }
}

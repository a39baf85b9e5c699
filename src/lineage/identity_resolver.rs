use std::{collections::{HashMap, HashSet}, sync::Arc};

use tracing::debug;

use crate::{
    catalog::{Artifact, CatalogSnapshot},
    graph::{LineageError, LineageGraph, LineageResult, NodeKind, PlanNode},
    plan::{LogicalPlan, PlanId},
};

/// Walks every artifact root and merges nodes that share an identity.
///
/// Names and cache flags are collected from all artifacts before the walk,
/// so kind and label of a node do not depend on which root reaches it first.
pub struct IdentityResolver {
    names: HashMap<PlanId, String>,
    cache_points: HashSet<PlanId>,
    seen: HashMap<PlanId, LogicalPlan>,
    graph: LineageGraph,
}

impl IdentityResolver {
    pub fn resolve(snapshot: &CatalogSnapshot) -> LineageResult<LineageGraph> {
        let mut resolver = Self::new(snapshot.artifacts())?;
        for artifact in snapshot.artifacts() {
            resolver.visit(&artifact.plan)?;
        }
        debug!(nodes = resolver.graph.node_count(), roots = snapshot.artifacts().len(), "resolved plan identities");
        resolver.graph.validate()?;
        Ok(resolver.graph)
    }

    fn new(artifacts: &[Artifact]) -> LineageResult<Self> {
        let mut names: HashMap<PlanId, String> = HashMap::new();
        let mut cache_points = HashSet::new();

        for artifact in artifacts {
            let root = artifact.root_id();
            if let Some(name) = &artifact.name {
                match names.get(&root) {
                    Some(existing) if existing != name => {
                        return LineageError::structural(format!(
                            "identity {} registered as both `{}` and `{}`",
                            root, existing, name
                        )).err();
                    }
                    _ => { names.insert(root, name.clone()); }
                }
            }
            if artifact.cached {
                cache_points.insert(root);
            }
        }

        Ok(Self {
            names,
            cache_points,
            seen: HashMap::new(),
            graph: LineageGraph::new(),
        })
    }

    fn visit(&mut self, root: &LogicalPlan) -> LineageResult<()> {
        let mut stack = vec![Arc::clone(root)];
        while let Some(plan) = stack.pop() {
            if let Some(existing) = self.seen.get(&plan.id) {
                if !Arc::ptr_eq(existing, &plan) {
                    return LineageError::structural(format!(
                        "identity {} is carried by two distinct plan nodes ({} and {})",
                        plan.id,
                        existing.op.kind_name(),
                        plan.op.kind_name()
                    )).err();
                }
                // already captured together with its subtree
                continue;
            }
            self.seen.insert(plan.id, Arc::clone(&plan));

            let catalog_name = self.names.get(&plan.id).cloned();
            let is_cache_point = self.cache_points.contains(&plan.id);
            let kind = NodeKind::resolve(&plan.op, catalog_name.as_deref(), is_cache_point);
            let label = catalog_name.clone().unwrap_or_else(|| plan.label());
            debug!(id = %plan.id, label = %label, kind = ?kind, "resolved node");

            self.graph.insert_node(PlanNode {
                identity: plan.id,
                kind,
                label,
                columns: plan.output.clone(),
                children: plan.children.iter().map(|c| c.id).collect(),
                is_cache_point,
                catalog_name,
                op: plan.op.clone(),
            })?;
            stack.extend(plan.children.iter().rev().cloned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Catalog, CatalogCommon},
        plan::{AggregateCall, IdManager, LogicalNode, LogicalOp, NamedExpr, PlanBuilder, ScalarExpr},
    };

    fn aggregate_over_literal(catalog: &Catalog) -> PlanBuilder {
        catalog.local_relation(&["k", "v"])
            .aggregate(
                vec![NamedExpr::new(ScalarExpr::column("k"))],
                vec![AggregateCall::new("sum", vec![ScalarExpr::column("v")]).into()],
            )
            .unwrap()
    }

    #[test]
    fn cached_fragment_is_resolved_once() {
        let catalog = Catalog::new_catalog();
        catalog.cache_table("t1", aggregate_over_literal(&catalog)).unwrap();
        let t2 = catalog.table("t1").unwrap()
            .filter(ScalarExpr::binary(ScalarExpr::column("k"), crate::plan::BinaryOperator::Gt, ScalarExpr::int(1)))
            .unwrap()
            .select(&["k"])
            .unwrap();
        catalog.create_temp_view("t2", t2).unwrap();

        let graph = IdentityResolver::resolve(&catalog.snapshot()).unwrap();
        // LocalRelation, Aggregate, t1, Filter, Project, t2
        assert_eq!(graph.node_count(), 6);
        let aggregates = graph.nodes().filter(|n| n.op.kind_name() == "Aggregate").count();
        assert_eq!(aggregates, 1);

        let t1 = graph.find_by_label("t1").unwrap();
        assert_eq!(t1.kind, NodeKind::NamedEntity);
        assert!(t1.is_cache_point);
        let filter = graph.nodes().find(|n| n.op.kind_name() == "Filter").unwrap();
        assert_eq!(filter.children, vec![t1.identity]);
    }

    #[test]
    fn unnamed_cache_point_is_a_boundary() {
        let catalog = Catalog::new_catalog();
        let fragment = aggregate_over_literal(&catalog).build();
        catalog.cache(&fragment);

        let graph = IdentityResolver::resolve(&catalog.snapshot()).unwrap();
        let node = graph.node(fragment.id).unwrap();
        assert_eq!(node.kind, NodeKind::CacheBoundary);
        assert_eq!(node.label, fragment.label());
        assert_eq!(node.catalog_name, None);
    }

    #[test]
    fn naming_does_not_depend_on_visit_order() {
        let catalog = Catalog::new_catalog();
        let base = catalog.local_relation(&["x"]).view("base").build();
        // the consumer is registered first and reaches `base` before its own entry
        let consumer = PlanBuilder::from_plan(&catalog.ids(), Arc::clone(&base)).limit(3).build();
        let snapshot = CatalogSnapshot::new(vec![
            Artifact::named("consumer", consumer),
            Artifact::named("base", base),
        ]);

        let graph = IdentityResolver::resolve(&snapshot).unwrap();
        assert_eq!(graph.find_by_label("base").unwrap().kind, NodeKind::NamedEntity);
    }

    #[test]
    fn reused_identity_on_distinct_nodes_fails_fast() {
        let ids = Arc::new(IdManager::new());
        let a = LogicalNode::new(crate::plan::PlanId(7), LogicalOp::LocalRelation, vec!["x".into()], vec![]);
        let b = LogicalNode::new(crate::plan::PlanId(7), LogicalOp::LocalRelation, vec!["x".into()], vec![]);
        let top = PlanBuilder::from_plan(&ids, a).limit(1).build();
        let snapshot = CatalogSnapshot::new(vec![Artifact::named("a", top), Artifact::named("b", b)]);

        let err = IdentityResolver::resolve(&snapshot).unwrap_err();
        assert!(matches!(err, LineageError::StructuralInconsistency(_)));
    }

    #[test]
    fn deep_chains_resolve_without_recursion() {
        let catalog = Catalog::new_catalog();
        let mut plan = catalog.local_relation(&["x"]);
        for _ in 0..50_000 {
            plan = plan.limit(1);
        }
        catalog.create_temp_view("deep", plan).unwrap();

        let graph = IdentityResolver::resolve(&catalog.snapshot()).unwrap();
        assert_eq!(graph.node_count(), 50_002);
        assert_eq!(graph.find_by_label("deep").unwrap().kind, NodeKind::NamedEntity);
    }

    #[test]
    fn conflicting_names_for_one_root_fail() {
        let catalog = Catalog::new_catalog();
        let plan = catalog.range(0, 2).build();
        let snapshot = CatalogSnapshot::new(vec![
            Artifact::named("a", Arc::clone(&plan)),
            Artifact::named("b", plan),
        ]);
        assert!(IdentityResolver::resolve(&snapshot).is_err());
    }
}

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::debug;

use crate::{
    graph::{LineageGraph, LineageResult},
    plan::PlanId,
};

/// Reduces the operator-level graph to anchors (sources, cache boundaries,
/// named entities) with transitive column edges between them.
pub struct Contraction;

impl Contraction {
    pub fn contract(full: &LineageGraph) -> LineageResult<LineageGraph> {
        let mut contracted = LineageGraph::new();
        let mut edges = Vec::new();

        for anchor in full.nodes().filter(|n| n.is_anchor()) {
            let mut upstream: BTreeSet<PlanId> = BTreeSet::new();
            for ordinal in 0..anchor.columns.len() {
                for (node, source_ordinal) in Self::anchor_sources(full, anchor.identity, ordinal)? {
                    upstream.insert(node);
                    edges.push(((node, source_ordinal), (anchor.identity, ordinal)));
                }
            }

            let mut node = anchor.clone();
            node.children = upstream.into_iter().collect();
            contracted.insert_node(node)?;
        }

        for (producer, consumer) in edges {
            contracted.add_edge(producer, consumer)?;
        }
        contracted.validate()?;
        debug!(
            anchors = contracted.node_count(),
            edges = contracted.edge_count(),
            dropped = full.node_count() - contracted.node_count(),
            "contracted lineage graph"
        );
        Ok(contracted)
    }

    /// Anchor columns reached walking backward from `(id, ordinal)` through
    /// non-anchor nodes only. The walk stops at the first anchor on each path.
    pub fn anchor_sources(
        full: &LineageGraph,
        id: PlanId,
        ordinal: usize,
    ) -> LineageResult<BTreeSet<(PlanId, usize)>> {
        let mut found = BTreeSet::new();
        let mut visited: HashSet<(PlanId, usize)> = HashSet::new();
        let mut queue: VecDeque<(PlanId, usize)> = full.producers(id, ordinal)
            .into_iter()
            .map(|c| (c.node, c.ordinal))
            .collect();

        while let Some((node, port)) = queue.pop_front() {
            if !visited.insert((node, port)) {
                continue;
            }
            if full.require(node)?.is_anchor() {
                found.insert((node, port));
                continue;
            }
            queue.extend(full.producers(node, port).into_iter().map(|c| (c.node, c.ordinal)));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Catalog, CatalogCommon},
        graph::NodeKind,
        lineage::{ColumnPropagator, IdentityResolver},
        plan::{AggregateCall, BinaryOperator, JoinType, NamedExpr, ScalarExpr},
    };

    fn full_graph(catalog: &Catalog) -> LineageGraph {
        let mut graph = IdentityResolver::resolve(&catalog.snapshot()).unwrap();
        ColumnPropagator::propagate(&mut graph).unwrap();
        graph
    }

    fn edge_labels(graph: &LineageGraph) -> Vec<String> {
        graph.sorted_edges().unwrap()
            .into_iter()
            .map(|(p, e, c)| format!("{}:{}->{}:{}", p.label, e.producer.ordinal, c.label, e.consumer.ordinal))
            .collect()
    }

    #[test]
    fn operator_chains_collapse_into_direct_edges() {
        let catalog = Catalog::new_catalog();
        catalog.cache_table("t1", catalog.local_relation(&["k", "v"])
            .aggregate(
                vec![NamedExpr::new(ScalarExpr::column("k"))],
                vec![AggregateCall::new("sum", vec![ScalarExpr::column("v")]).into()],
            )
            .unwrap()
        ).unwrap();
        let t2 = catalog.table("t1").unwrap()
            .filter(ScalarExpr::binary(ScalarExpr::column("k"), BinaryOperator::Gt, ScalarExpr::int(1)))
            .unwrap()
            .select(&["sum(v)"])
            .unwrap();
        catalog.create_temp_view("t2", t2).unwrap();

        let contracted = Contraction::contract(&full_graph(&catalog)).unwrap();
        let labels: Vec<&str> = contracted.sorted_nodes().iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["LocalRelation_1", "t1", "t2"]);
        assert_eq!(
            edge_labels(&contracted),
            vec![
                "LocalRelation_1:0->t1:0".to_string(),
                "LocalRelation_1:1->t1:1".to_string(),
                "t1:1->t2:0".to_string(),
            ]
        );
        assert_eq!(contracted.find_by_label("t2").unwrap().children, vec![contracted.find_by_label("t1").unwrap().identity]);
    }

    #[test]
    fn literal_columns_stay_without_edges() {
        let catalog = Catalog::new_catalog();
        let plan = catalog.range(0, 5)
            .project(vec![
                NamedExpr::new(ScalarExpr::column("id")),
                NamedExpr::aliased(ScalarExpr::int(42), "answer"),
            ])
            .unwrap();
        catalog.create_temp_view("v", plan).unwrap();

        let contracted = Contraction::contract(&full_graph(&catalog)).unwrap();
        let v = contracted.find_by_label("v").unwrap();
        assert_eq!(v.columns, vec!["id".to_string(), "answer".to_string()]);
        assert_eq!(contracted.incoming_to(v.identity, 0).len(), 1);
        assert!(contracted.incoming_to(v.identity, 1).is_empty());
    }

    #[test]
    fn contracted_edges_are_backed_by_operator_paths() {
        let catalog = Catalog::new_catalog();
        catalog.create_table("people", &["id", "name"]).unwrap();
        catalog.create_table("orders", &["person_id", "amount"]).unwrap();
        let report = catalog.table("people").unwrap()
            .join(
                catalog.table("orders").unwrap(),
                JoinType::Left,
                Some(ScalarExpr::binary(ScalarExpr::column("id"), BinaryOperator::Eq, ScalarExpr::column("person_id"))),
            )
            .unwrap()
            .group_by(
                vec![ScalarExpr::column("name")],
                vec![
                    NamedExpr::new(ScalarExpr::column("name")),
                    NamedExpr::aliased(ScalarExpr::call("sum", vec![ScalarExpr::column("amount")]), "total"),
                ],
            )
            .unwrap();
        catalog.create_temp_view("report", report).unwrap();

        let full = full_graph(&catalog);
        let contracted = Contraction::contract(&full).unwrap();
        assert_eq!(
            edge_labels(&contracted),
            vec!["orders:1->report:1".to_string(), "people:1->report:0".to_string()]
        );

        // every contracted edge has a backward full-graph path through operators only
        for edge in contracted.edges() {
            let reached = Contraction::anchor_sources(&full, edge.consumer.node, edge.consumer.ordinal).unwrap();
            assert!(reached.contains(&(edge.producer.node, edge.producer.ordinal)));
        }
        for node in contracted.nodes() {
            assert_ne!(node.kind, NodeKind::Operator);
        }
        contracted.topological_order().unwrap();
    }
}

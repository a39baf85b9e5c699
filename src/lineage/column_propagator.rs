use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    graph::{LineageError, LineageGraph, LineageResult, PlanNode},
    plan::{LogicalOp, PlanId},
};

/// Inputs of one output column: (child identity, child ordinal) pairs.
pub type ColumnSources = Vec<(PlanId, usize)>;

/// Computes column-level provenance for every node and records it as edges.
pub struct ColumnPropagator;

impl ColumnPropagator {
    /// Add the lineage edges of every node. Returns the number of new edges.
    pub fn propagate(graph: &mut LineageGraph) -> LineageResult<usize> {
        let mut pending = Vec::new();
        for node in graph.nodes() {
            for (ordinal, inputs) in Self::column_sources(graph, node)?.into_iter().enumerate() {
                for input in inputs {
                    pending.push((input, (node.identity, ordinal)));
                }
            }
        }

        let mut added = 0;
        for (producer, consumer) in pending {
            if graph.add_edge(producer, consumer)? {
                added += 1;
            }
        }
        debug!(edges = added, nodes = graph.node_count(), "propagated column lineage");
        Ok(added)
    }

    /// For each output column of `node`, the child columns it derives from.
    pub fn column_sources(graph: &LineageGraph, node: &PlanNode) -> LineageResult<Vec<ColumnSources>> {
        let children = node.children.iter()
            .map(|c| graph.require(*c))
            .collect::<LineageResult<Vec<_>>>()?;
        let width = node.columns.len();

        match &node.op {
            LogicalOp::LocalRelation | LogicalOp::Range { .. } | LogicalOp::Scan { .. } => {
                if !children.is_empty() {
                    return LineageError::structural(format!("source {} has children", node.label)).err();
                }
                Ok(vec![Vec::new(); width])
            }

            LogicalOp::Project { exprs } => {
                let child = Self::single_child(node, &children)?;
                Self::expect_width(node, exprs.len())?;
                exprs.iter()
                    .map(|e| Self::from_ordinals(child, e.expr.input_ordinals()?))
                    .collect()
            }

            // rows change, provenance does not
            LogicalOp::Filter { .. }
            | LogicalOp::Sort { .. }
            | LogicalOp::Limit { .. }
            | LogicalOp::SubqueryAlias { .. }
            | LogicalOp::View { .. } => {
                let child = Self::single_child(node, &children)?;
                Self::expect_width(node, child.columns.len())?;
                Ok((0..width).map(|i| vec![(child.identity, i)]).collect())
            }

            LogicalOp::Aggregate { group_keys, aggs } => {
                let child = Self::single_child(node, &children)?;
                Self::expect_width(node, group_keys.len() + aggs.len())?;
                let keys = group_keys.iter().map(|k| k.expr.input_ordinals());
                let results = aggs.iter().map(|a| a.call.input_ordinals());
                keys.chain(results)
                    .map(|ordinals| Self::from_ordinals(child, ordinals?))
                    .collect()
            }

            LogicalOp::Union => {
                if children.is_empty() {
                    return LineageError::structural(format!("{} has no inputs", node.label)).err();
                }
                for child in &children {
                    Self::expect_width(node, child.columns.len())?;
                }
                Ok((0..width)
                    .map(|i| children.iter().map(|c| (c.identity, i)).collect())
                    .collect())
            }

            LogicalOp::Join { join_type, .. } => {
                let contributing = if join_type.emits_right() { &children[..] } else { &children[..children.len().min(1)] };
                let mut sources = Vec::with_capacity(width);
                for child in contributing {
                    sources.extend((0..child.columns.len()).map(|i| vec![(child.identity, i)]));
                }
                Self::expect_width(node, sources.len())?;
                Ok(sources)
            }
        }
    }

    fn single_child<'a>(node: &PlanNode, children: &[&'a PlanNode]) -> LineageResult<&'a PlanNode> {
        match children {
            [child] => Ok(*child),
            _ => LineageError::structural(format!(
                "{} expects one input, found {}",
                node.label,
                children.len()
            )).err(),
        }
    }

    fn expect_width(node: &PlanNode, expected: usize) -> LineageResult<()> {
        if node.columns.len() != expected {
            return LineageError::structural(format!(
                "{} declares {} columns but its inputs produce {}",
                node.label,
                node.columns.len(),
                expected
            )).err();
        }
        Ok(())
    }

    fn from_ordinals(child: &PlanNode, ordinals: BTreeSet<usize>) -> LineageResult<ColumnSources> {
        ordinals.into_iter()
            .map(|ordinal| child.column(ordinal).map(|c| (c.node, c.ordinal)))
            .collect()
    }
}

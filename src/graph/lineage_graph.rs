use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use petgraph::{
    algo::{is_cyclic_directed, toposort},
    graph::{DiGraph, NodeIndex},
    graphmap::DiGraphMap,
    Direction,
};

use crate::{graph::{ColumnRef, Edge, LineageError, LineageResult, PlanNode}, plan::PlanId};

/// Column-level lineage DAG.
///
/// Nodes live in an arena keyed by identity; children and edges refer to them
/// by identity only. Column edges are kept twice: as an ordered set for
/// rendering, and as a `petgraph` digraph over ports for upstream walks.
/// Insertion order carries no meaning: renderers sort by label and ordinal.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    nodes: IndexMap<PlanId, PlanNode>,
    labels: HashMap<String, PlanId>,
    edges: BTreeSet<Edge>,
    /// One graph node per port that takes part in at least one edge.
    lineage: DiGraph<ColumnRef, ()>,
    ports: HashMap<(PlanId, usize), NodeIndex>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, node: PlanNode) -> LineageResult<()> {
        if self.nodes.contains_key(&node.identity) {
            return LineageError::structural(format!("identity {} inserted twice", node.identity)).err();
        }
        if let Some(other) = self.labels.get(&node.label) {
            return LineageError::structural(format!(
                "label `{}` used by identities {} and {}",
                node.label, other, node.identity
            )).err();
        }
        self.labels.insert(node.label.clone(), node.identity);
        self.nodes.insert(node.identity, node);
        Ok(())
    }

    pub fn node(&self, id: PlanId) -> Option<&PlanNode> {
        self.nodes.get(&id)
    }

    /// Like `node`, but a missing identity is a structural error.
    pub fn require(&self, id: PlanId) -> LineageResult<&PlanNode> {
        self.nodes.get(&id)
            .ok_or_else(|| LineageError::structural(format!("identity {} is not part of the graph", id)))
    }

    pub fn find_by_label(&self, label: &str) -> Option<&PlanNode> {
        self.labels.get(label).and_then(|id| self.nodes.get(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add `producer -> consumer`. Both endpoints must exist and the ordinals
    /// must be in range. Returns false when the edge was already present.
    pub fn add_edge(&mut self, producer: (PlanId, usize), consumer: (PlanId, usize)) -> LineageResult<bool> {
        let producer = self.require(producer.0)?.column(producer.1)?;
        let consumer = self.require(consumer.0)?.column(consumer.1)?;
        if producer.node == consumer.node {
            return LineageError::structural(format!("self edge on identity {}", producer.node)).err();
        }
        let edge = Edge { producer: producer.clone(), consumer: consumer.clone() };
        if !self.edges.insert(edge) {
            return Ok(false);
        }

        let from = self.port_index(producer);
        let to = self.port_index(consumer);
        self.lineage.add_edge(from, to, ());
        Ok(true)
    }

    fn port_index(&mut self, column: ColumnRef) -> NodeIndex {
        let key = (column.node, column.ordinal);
        if let Some(&idx) = self.ports.get(&key) {
            idx
        } else {
            let idx = self.lineage.add_node(column);
            self.ports.insert(key, idx);
            idx
        }
    }

    /// Columns feeding port `ordinal` of `id` directly, in column order.
    pub fn producers(&self, id: PlanId, ordinal: usize) -> Vec<&ColumnRef> {
        let Some(&idx) = self.ports.get(&(id, ordinal)) else {
            return Vec::new();
        };
        let mut producers: Vec<&ColumnRef> = self.lineage
            .neighbors_directed(idx, Direction::Incoming)
            .filter_map(|n| self.lineage.node_weight(n))
            .collect();
        producers.sort();
        producers
    }

    pub fn incoming_to(&self, id: PlanId, ordinal: usize) -> Vec<&Edge> {
        self.edges.iter()
            .filter(|e| e.consumer.node == id && e.consumer.ordinal == ordinal)
            .collect()
    }

    /// Nodes in label order.
    pub fn sorted_nodes(&self) -> Vec<&PlanNode> {
        let mut nodes: Vec<&PlanNode> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.label.cmp(&b.label));
        nodes
    }

    /// Edges ordered by (producer label, producer ordinal, consumer label,
    /// consumer ordinal), each paired with its endpoint nodes.
    pub fn sorted_edges(&self) -> LineageResult<Vec<(&PlanNode, &Edge, &PlanNode)>> {
        let mut edges = self.edges.iter()
            .map(|e| Ok((self.require(e.producer.node)?, e, self.require(e.consumer.node)?)))
            .collect::<LineageResult<Vec<_>>>()?;
        edges.sort_by(|(pa, ea, ca), (pb, eb, cb)| {
            (&pa.label, ea.producer.ordinal, &ca.label, ea.consumer.ordinal)
                .cmp(&(&pb.label, eb.producer.ordinal, &cb.label, eb.consumer.ordinal))
        });
        Ok(edges)
    }

    /// Nodes with producers before consumers; fails when the node relation
    /// (children plus column edges) has a cycle or dangles.
    pub fn topological_order(&self) -> LineageResult<Vec<PlanId>> {
        let mut relation: DiGraphMap<PlanId, ()> = DiGraphMap::with_capacity(self.nodes.len(), self.edges.len());
        for id in self.nodes.keys() {
            relation.add_node(*id);
        }
        for node in self.nodes.values() {
            for child in &node.children {
                self.require(*child)?;
                relation.add_edge(*child, node.identity, ());
            }
        }
        for edge in &self.edges {
            relation.add_edge(edge.producer.node, edge.consumer.node, ());
        }

        toposort(&relation, None).map_err(|cycle| {
            LineageError::structural(format!("lineage graph has a cycle through identity {}", cycle.node_id()))
        })
    }

    /// Check every structural invariant at once.
    pub fn validate(&self) -> LineageResult<()> {
        for edge in &self.edges {
            self.require(edge.producer.node)?.column(edge.producer.ordinal)?;
            self.require(edge.consumer.node)?.column(edge.consumer.ordinal)?;
        }
        if is_cyclic_directed(&self.lineage) {
            return LineageError::structural("column lineage has a cycle").err();
        }
        self.topological_order().map(|_| ())
    }
}

use serde::Serialize;

use crate::graph::{LineageGraph, LineageResult, NodeKind};

#[derive(Debug, Serialize)]
pub struct AdjacencyList {
    pub nodes: Vec<AdjacencyNode>,
    pub edges: Vec<AdjacencyEdge>,
}

#[derive(Debug, Serialize)]
pub struct AdjacencyNode {
    pub label: String,
    pub kind: NodeKind,
    pub columns: Vec<String>,
    /// Labels of the nodes this one reads from, sorted.
    pub inputs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AdjacencyEdge {
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Serialize)]
pub struct Endpoint {
    pub node: String,
    pub port: usize,
    pub column: String,
}

/// JSON rendition of a lineage graph, ordered like the DOT output.
pub struct AdjacencyListWriter;

impl AdjacencyListWriter {
    pub fn build(graph: &LineageGraph) -> LineageResult<AdjacencyList> {
        let mut nodes = Vec::with_capacity(graph.node_count());
        for node in graph.sorted_nodes() {
            let mut inputs = node.children.iter()
                .map(|c| graph.require(*c).map(|child| child.label.clone()))
                .collect::<LineageResult<Vec<_>>>()?;
            inputs.sort();
            inputs.dedup();
            nodes.push(AdjacencyNode {
                label: node.label.clone(),
                kind: node.kind,
                columns: node.columns.clone(),
                inputs,
            });
        }

        let edges = graph.sorted_edges()?
            .into_iter()
            .map(|(producer, edge, consumer)| AdjacencyEdge {
                from: Endpoint {
                    node: producer.label.clone(),
                    port: edge.producer.ordinal,
                    column: edge.producer.name.clone(),
                },
                to: Endpoint {
                    node: consumer.label.clone(),
                    port: edge.consumer.ordinal,
                    column: edge.consumer.name.clone(),
                },
            })
            .collect();

        Ok(AdjacencyList { nodes, edges })
    }

    pub fn render(graph: &LineageGraph) -> LineageResult<String> {
        let mut json = serde_json::to_string_pretty(&Self::build(graph)?)?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{graph::PlanNode, plan::{LogicalOp, PlanId}};

    #[test]
    fn lists_sorted_nodes_and_labelled_edges() {
        let mut graph = LineageGraph::new();
        graph.insert_node(PlanNode {
            identity: PlanId(1),
            kind: NodeKind::Source,
            label: "LocalRelation_1".into(),
            columns: vec!["k".into(), "v".into()],
            children: vec![],
            is_cache_point: false,
            catalog_name: None,
            op: LogicalOp::LocalRelation,
        }).unwrap();
        graph.insert_node(PlanNode {
            identity: PlanId(2),
            kind: NodeKind::NamedEntity,
            label: "t".into(),
            columns: vec!["v".into()],
            children: vec![PlanId(1)],
            is_cache_point: true,
            catalog_name: Some("t".into()),
            op: LogicalOp::View { name: "t".into() },
        }).unwrap();
        graph.add_edge((PlanId(1), 1), (PlanId(2), 0)).unwrap();

        let value: serde_json::Value = serde_json::from_str(&AdjacencyListWriter::render(&graph).unwrap()).unwrap();
        assert_eq!(value, json!({
            "nodes": [
                { "label": "LocalRelation_1", "kind": "source", "columns": ["k", "v"], "inputs": [] },
                { "label": "t", "kind": "named_entity", "columns": ["v"], "inputs": ["LocalRelation_1"] }
            ],
            "edges": [
                {
                    "from": { "node": "LocalRelation_1", "port": 1, "column": "v" },
                    "to": { "node": "t", "port": 0, "column": "v" }
                }
            ]
        }));
    }
}

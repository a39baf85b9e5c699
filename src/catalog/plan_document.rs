use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::{Artifact, CatalogSnapshot},
    graph::{LineageError, LineageResult},
    plan::{is_generated_label, LogicalNode, LogicalOp, LogicalPlan, PlanId},
};

/// Plans exported by another engine: a flat node list where children are
/// referenced by id, plus the artifacts rooted in it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanDocument {
    pub artifacts: Vec<ArtifactSpec>,
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub root: PlanId,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSpec {
    pub id: PlanId,
    #[serde(flatten)]
    pub op: LogicalOp,
    pub output: Vec<String>,
    #[serde(default)]
    pub children: Vec<PlanId>,
}

impl PlanDocument {
    pub fn from_json(text: &str) -> LineageResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Link the node list into shared plan trees. Every id becomes exactly one
    /// `Arc` node, so references from several parents share identity.
    pub fn into_snapshot(self) -> LineageResult<CatalogSnapshot> {
        let mut specs: HashMap<PlanId, NodeSpec> = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            let id = node.id;
            if specs.insert(id, node).is_some() {
                return LineageError::structural(format!("node id {} declared twice", id)).err();
            }
        }

        let mut linker = Linker { specs: &specs, built: HashMap::new(), visiting: HashSet::new() };
        let artifacts = self.artifacts.into_iter()
            .map(|a| {
                if let Some(name) = a.name.as_deref().filter(|n| is_generated_label(n)) {
                    return LineageError::ReservedName(name.to_string()).err();
                }
                let plan = linker.link(a.root)?;
                Ok(Artifact { name: a.name, plan, cached: a.cached })
            })
            .collect::<LineageResult<Vec<_>>>()?;

        debug!(artifacts = artifacts.len(), nodes = linker.built.len(), "linked plan document");
        Ok(CatalogSnapshot::new(artifacts))
    }
}

struct Linker<'a> {
    specs: &'a HashMap<PlanId, NodeSpec>,
    built: HashMap<PlanId, LogicalPlan>,
    /// nodes on the current path from the root
    visiting: HashSet<PlanId>,
}

enum Frame {
    /// node id, referencing parent
    Enter(PlanId, Option<PlanId>),
    /// all children built
    Exit(PlanId),
}

impl<'a> Linker<'a> {
    fn link(&mut self, root: PlanId) -> LineageResult<LogicalPlan> {
        let mut stack = vec![Frame::Enter(root, None)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id, parent) => {
                    if self.built.contains_key(&id) {
                        continue;
                    }
                    let spec = self.spec(id, parent)?;
                    if !self.visiting.insert(id) {
                        return LineageError::structural(format!("node {} is its own ancestor", id)).err();
                    }
                    stack.push(Frame::Exit(id));
                    stack.extend(spec.children.iter().rev().map(|child| Frame::Enter(*child, Some(id))));
                }
                Frame::Exit(id) => {
                    let spec = self.spec(id, None)?;
                    let children = spec.children.iter()
                        .map(|child| self.built.get(child).map(LogicalPlan::clone).ok_or_else(|| {
                            LineageError::structural(format!("node {} linked before child {}", id, child))
                        }))
                        .collect::<LineageResult<Vec<_>>>()?;
                    let plan = LogicalNode::new(id, spec.op.clone(), spec.output.clone(), children);
                    self.visiting.remove(&id);
                    self.built.insert(id, plan);
                }
            }
        }

        self.built.get(&root)
            .map(LogicalPlan::clone)
            .ok_or_else(|| LineageError::structural(format!("artifact root {} was not linked", root)))
    }

    fn spec(&self, id: PlanId, parent: Option<PlanId>) -> LineageResult<&'a NodeSpec> {
        match (self.specs.get(&id), parent) {
            (Some(spec), _) => Ok(spec),
            (None, Some(parent)) => LineageError::structural(format!(
                "node {} references child {} which is not declared", parent, id
            )).err(),
            (None, None) => LineageError::structural(format!(
                "artifact root {} is not declared", id
            )).err(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SHARED: &str = r#"{
        "artifacts": [
            { "name": "t1", "root": 3, "cached": true },
            { "name": "t2", "root": 6 }
        ],
        "nodes": [
            { "id": 1, "op": "local_relation", "output": ["k", "v"] },
            { "id": 2, "op": "aggregate", "output": ["k", "sum(v)"], "children": [1],
              "group_keys": [ { "expr": { "column": { "ordinal": 0, "name": "k" } } } ],
              "aggs": [ { "call": { "func": "sum", "args": [ { "column": { "ordinal": 1, "name": "v" } } ] } } ] },
            { "id": 3, "op": "view", "name": "t1", "output": ["k", "sum(v)"], "children": [2] },
            { "id": 4, "op": "filter", "output": ["k", "sum(v)"], "children": [3],
              "predicate": { "binary": { "left": { "column": { "ordinal": 0, "name": "k" } }, "op": "gt", "right": { "literal": { "type": "int", "value": 1 } } } } },
            { "id": 5, "op": "project", "output": ["k"], "children": [4],
              "exprs": [ { "expr": { "column": { "ordinal": 0, "name": "k" } } } ] },
            { "id": 6, "op": "view", "name": "t2", "output": ["k"], "children": [5] }
        ]
    }"#;

    #[test]
    fn shared_ids_become_shared_nodes() {
        let snapshot = PlanDocument::from_json(SHARED).unwrap().into_snapshot().unwrap();
        let artifacts = snapshot.artifacts();
        assert_eq!(artifacts.len(), 2);
        assert!(artifacts[0].cached);

        let t1 = &artifacts[0].plan;
        let t2_filter = &artifacts[1].plan.children[0].children[0];
        assert!(Arc::ptr_eq(t1, &t2_filter.children[0]));
        assert_eq!(t1.children[0].label(), "Aggregate_2");
    }

    #[test]
    fn missing_child_is_structural() {
        let text = r#"{
            "artifacts": [ { "name": "t", "root": 2 } ],
            "nodes": [ { "id": 2, "op": "limit", "limit": 5, "output": ["x"], "children": [9] } ]
        }"#;
        let err = PlanDocument::from_json(text).unwrap().into_snapshot().unwrap_err();
        match err {
            LineageError::StructuralInconsistency(msg) => assert!(msg.contains("child 9")),
            other => panic!("expected StructuralInconsistency, got {other:?}"),
        }
    }

    #[test]
    fn cycles_and_duplicate_ids_are_structural() {
        let cycle = r#"{
            "artifacts": [ { "root": 1, "cached": true } ],
            "nodes": [
                { "id": 1, "op": "limit", "limit": 1, "output": ["x"], "children": [2] },
                { "id": 2, "op": "limit", "limit": 1, "output": ["x"], "children": [1] }
            ]
        }"#;
        assert!(matches!(
            PlanDocument::from_json(cycle).unwrap().into_snapshot(),
            Err(LineageError::StructuralInconsistency(_))
        ));

        let duplicate = r#"{
            "artifacts": [],
            "nodes": [
                { "id": 1, "op": "local_relation", "output": ["x"] },
                { "id": 1, "op": "local_relation", "output": ["y"] }
            ]
        }"#;
        assert!(matches!(
            PlanDocument::from_json(duplicate).unwrap().into_snapshot(),
            Err(LineageError::StructuralInconsistency(_))
        ));
    }

    #[test]
    fn deep_documents_link_without_recursion() {
        let depth = 50_000u64;
        let mut nodes = vec![r#"{ "id": 0, "op": "local_relation", "output": ["x"] }"#.to_string()];
        nodes.extend((1..=depth).map(|id| format!(
            r#"{{ "id": {}, "op": "limit", "limit": 1, "output": ["x"], "children": [{}] }}"#,
            id,
            id - 1
        )));
        let text = format!(
            r#"{{ "artifacts": [ {{ "name": "deep", "root": {} }} ], "nodes": [ {} ] }}"#,
            depth,
            nodes.join(",")
        );

        let snapshot = PlanDocument::from_json(&text).unwrap().into_snapshot().unwrap();
        let mut plan = &snapshot.artifacts()[0].plan;
        let mut length = 1;
        while let Some(child) = plan.children.first() {
            plan = child;
            length += 1;
        }
        assert_eq!(length, depth + 1);
        assert_eq!(plan.op, LogicalOp::LocalRelation);
    }

    #[test]
    fn generated_label_names_are_rejected() {
        let text = r#"{
            "artifacts": [ { "name": "Limit_2", "root": 2 } ],
            "nodes": [
                { "id": 1, "op": "local_relation", "output": ["x"] },
                { "id": 2, "op": "limit", "limit": 5, "output": ["x"], "children": [1] }
            ]
        }"#;
        assert!(matches!(
            PlanDocument::from_json(text).unwrap().into_snapshot(),
            Err(LineageError::ReservedName(ref n)) if n == "Limit_2"
        ));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(PlanDocument::from_json("{ nope"), Err(LineageError::Json(_))));
    }
}

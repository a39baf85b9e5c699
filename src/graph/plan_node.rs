use serde::Serialize;

use crate::{graph::{LineageError, LineageResult, NodeKind}, plan::{LogicalOp, PlanId}};

/// One output column of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnRef {
    pub node: PlanId,
    pub ordinal: usize,
    pub name: String,
}

/// `consumer` is derived (in whole or part) from `producer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub producer: ColumnRef,
    pub consumer: ColumnRef,
}

/// A deduplicated plan node of the lineage graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub identity: PlanId,
    pub kind: NodeKind,
    pub label: String,
    /// Ordered output columns; the position is the port number.
    pub columns: Vec<String>,
    /// Identity-keyed references into the same graph.
    pub children: Vec<PlanId>,
    pub is_cache_point: bool,
    pub catalog_name: Option<String>,
    pub op: LogicalOp,
}

impl PlanNode {
    pub fn column(&self, ordinal: usize) -> LineageResult<ColumnRef> {
        match self.columns.get(ordinal) {
            Some(name) => Ok(ColumnRef { node: self.identity, ordinal, name: name.clone() }),
            None => LineageError::structural(format!(
                "{} has {} columns, ordinal {} is out of range",
                self.label,
                self.columns.len(),
                ordinal
            )).err(),
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.kind.is_anchor()
    }
}

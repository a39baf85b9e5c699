use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::plan::{NamedAggregate, NamedExpr, PlanId, ScalarExpr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    LeftSemi,
    LeftAnti,
}

impl JoinType {
    /// Semi and anti joins only expose the left input.
    pub fn emits_right(&self) -> bool {
        !matches!(self, JoinType::LeftSemi | JoinType::LeftAnti)
    }
}

/// Operator of one analyzed plan node.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogicalOp {
    /// Inline literal rows.
    LocalRelation,

    /// Generated `id` column over `[start, end)`.
    Range { start: i64, end: i64 },

    /// Base table scan.
    Scan { table: String },

    /// Projection in SELECT order (bound).
    Project { exprs: Vec<NamedExpr> },

    /// Row-level filter (WHERE or HAVING depending on position in the tree).
    Filter { predicate: ScalarExpr },

    /// Output is the grouping keys followed by the aggregate results.
    Aggregate {
        group_keys: Vec<NamedExpr>,
        aggs: Vec<NamedAggregate>,
    },

    Sort { keys: Vec<ScalarExpr> },

    Limit { limit: u64 },

    /// Positional combination of all children.
    Union,

    Join {
        join_type: JoinType,
        #[serde(default)]
        on: Option<ScalarExpr>,
    },

    SubqueryAlias { alias: String },

    /// Catalog view wrapper; its node is the named artifact root.
    View { name: String },
}

impl LogicalOp {
    pub const KIND_NAMES: [&'static str; 12] = [
        "LocalRelation", "Range", "Scan", "Project", "Filter", "Aggregate",
        "Sort", "Limit", "Union", "Join", "SubqueryAlias", "View",
    ];

    /// Operator kind used in anonymous display labels.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LogicalOp::LocalRelation => "LocalRelation",
            LogicalOp::Range { .. } => "Range",
            LogicalOp::Scan { .. } => "Scan",
            LogicalOp::Project { .. } => "Project",
            LogicalOp::Filter { .. } => "Filter",
            LogicalOp::Aggregate { .. } => "Aggregate",
            LogicalOp::Sort { .. } => "Sort",
            LogicalOp::Limit { .. } => "Limit",
            LogicalOp::Union => "Union",
            LogicalOp::Join { .. } => "Join",
            LogicalOp::SubqueryAlias { .. } => "SubqueryAlias",
            LogicalOp::View { .. } => "View",
        }
    }

    /// Leaf relations: the roots of provenance.
    pub fn is_source(&self) -> bool {
        matches!(self, LogicalOp::LocalRelation | LogicalOp::Range { .. } | LogicalOp::Scan { .. })
    }
}

/// One node of an analyzed plan, shared by `Arc` wherever the engine reuses it.
#[derive(Debug, PartialEq)]
pub struct LogicalNode {
    pub id: PlanId,
    pub op: LogicalOp,
    pub output: Vec<String>,
    pub children: Vec<LogicalPlan>,
}

pub type LogicalPlan = Arc<LogicalNode>;

impl LogicalNode {
    pub fn new(id: PlanId, op: LogicalOp, output: Vec<String>, children: Vec<LogicalPlan>) -> LogicalPlan {
        Arc::new(Self { id, op, output, children })
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.op.kind_name(), self.id)
    }
}

// Deep single-child chains would otherwise drop recursively.
impl Drop for LogicalNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(child) = stack.pop() {
            if let Ok(mut node) = Arc::try_unwrap(child) {
                stack.append(&mut node.children);
            }
        }
    }
}

/// True when `name` has the shape of an anonymous label (`<Kind>_<digits>`).
pub fn is_generated_label(name: &str) -> bool {
    let Some((kind, id)) = name.rsplit_once('_') else {
        return false;
    };
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && LogicalOp::KIND_NAMES.contains(&kind)
}

use serde::Serialize;

use crate::plan::LogicalOp;

/// Rendering category of a lineage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Base relation: literal rows, range, table scan.
    Source,
    /// Anonymous intermediate operator.
    Operator,
    /// Cached fragment without a catalog name.
    CacheBoundary,
    /// Registered table or view, cached or not.
    NamedEntity,
}

impl NodeKind {
    /// Name wins over cache; an unnamed cache point stays a boundary.
    pub fn resolve(op: &LogicalOp, catalog_name: Option<&str>, is_cache_point: bool) -> NodeKind {
        match (catalog_name, is_cache_point) {
            (Some(_), _) => NodeKind::NamedEntity,
            (None, true) => NodeKind::CacheBoundary,
            (None, false) if op.is_source() => NodeKind::Source,
            (None, false) => NodeKind::Operator,
        }
    }

    /// Anchors survive contraction.
    pub fn is_anchor(&self) -> bool {
        !matches!(self, NodeKind::Operator)
    }

    pub fn color(&self) -> &'static str {
        match self {
            NodeKind::Source => "lightpink",
            NodeKind::Operator => "lightgray",
            NodeKind::CacheBoundary => "lightblue",
            NodeKind::NamedEntity => "lightyellow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_cached_node_is_named_entity() {
        let op = LogicalOp::View { name: "t1".into() };
        assert_eq!(NodeKind::resolve(&op, Some("t1"), true), NodeKind::NamedEntity);
        assert_eq!(NodeKind::resolve(&op, None, true), NodeKind::CacheBoundary);
        assert_eq!(NodeKind::resolve(&op, None, false), NodeKind::Operator);
    }

    #[test]
    fn leaf_relations_are_sources() {
        assert_eq!(NodeKind::resolve(&LogicalOp::LocalRelation, None, false), NodeKind::Source);
        assert_eq!(NodeKind::resolve(&LogicalOp::Scan { table: "t".into() }, Some("t"), false), NodeKind::NamedEntity);
    }

    #[test]
    fn every_category_has_its_own_color() {
        let colors = [
            NodeKind::Source.color(),
            NodeKind::Operator.color(),
            NodeKind::CacheBoundary.color(),
            NodeKind::NamedEntity.color(),
        ];
        let unique: std::collections::HashSet<_> = colors.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(!NodeKind::Operator.is_anchor());
        assert!(NodeKind::CacheBoundary.is_anchor());
    }
}

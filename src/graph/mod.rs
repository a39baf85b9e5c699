pub mod lineage_error;
pub use lineage_error::*;

pub mod node_kind;
pub use node_kind::*;

pub mod plan_node;
pub use plan_node::*;

pub mod lineage_graph;
pub use lineage_graph::*;

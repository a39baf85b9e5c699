pub mod plan;
pub use plan::{IdManager, LogicalPlan, PlanBuilder, PlanId};

pub mod catalog;
pub use catalog::{Catalog, CatalogCommon, CatalogSnapshot, PlanDocument};

pub mod graph;
pub use graph::{LineageError, LineageGraph, LineageResult, NodeKind};

pub mod lineage;
pub use lineage::{Lineage, LineageRunner};

pub mod render;
pub use render::{ImageFormat, LineageConfig};

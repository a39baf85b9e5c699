pub mod identity_resolver;
pub mod column_propagator;
pub mod contraction;
pub mod lineage_runner;

pub use identity_resolver::*;
pub use column_propagator::*;
pub use contraction::*;
pub use lineage_runner::*;

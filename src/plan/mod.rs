pub mod plan_id;
pub use plan_id::*;

pub mod literal;
pub use literal::*;

pub mod column;
pub use column::*;

pub mod scalar_expr;
pub use scalar_expr::*;

pub mod aggregate_call;
pub use aggregate_call::{AggregateCall, NamedAggregate};

pub mod logical_plan;
pub use logical_plan::*;

pub mod plan_builder;
pub use plan_builder::*;

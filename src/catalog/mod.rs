pub mod artifact;
pub use artifact::*;

pub mod catalog;
pub use catalog::*;

pub mod plan_document;
pub use plan_document::*;

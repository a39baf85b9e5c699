pub mod image_format;
pub mod lineage_config;
pub mod dot_writer;
pub mod adjacency_list;
pub mod normalize;
pub mod output_writer;

pub use image_format::*;
pub use lineage_config::*;
pub use dot_writer::*;
pub use adjacency_list::*;
pub use normalize::*;
pub use output_writer::*;

pub mod config;
pub mod error;
pub mod records;
pub mod graph;
pub mod labels;
pub mod export;
pub mod layout;
pub mod render;
pub mod pipeline;

pub use config::Config;
pub use error::{CmdbMapError, Result};
pub use graph::{find_paths, CmdbGraph, DiscoveredPath, PathQuery};
pub use export::{export_graph, ExportFormat};
pub use pipeline::{LayoutPlan, PathReport, Session, TableBatch};

use thiserror::Error;

/// Main error type for cmdb-map
#[derive(Error, Debug)]
pub enum CmdbMapError {
    /// Source or target table absent from the assembled graph
    #[error("Table not found: {0}")]
    NotFound(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required input file is missing from the data directory
    #[error("Required input file not found: {0}")]
    MissingInput(String),

    /// Malformed input file or record
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A layout algorithm could not be applied to the graph
    #[error("Layout error: {0}")]
    Layout(String),

    /// Scene could not be written by the renderer
    #[error("Render error: {0}")]
    Render(String),

    /// Whole-graph export could not be serialized
    #[error("Export error: {0}")]
    Export(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using CmdbMapError
pub type Result<T> = std::result::Result<T, CmdbMapError>;

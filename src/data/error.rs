//! Error types for loading and querying grid tables.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data layer.
#[derive(Debug, Error)]
pub enum GridError {
    /// The input file is missing, unreadable or malformed.
    #[error("failed to load {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    /// A required column is absent from the header row.
    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// Score bounds were requested on a table with zero rows.
    #[error("dataset has no rows")]
    EmptyDataset,

    /// The grid id is not present in the (filtered) table.
    #[error("grid '{0}' not found in the current view")]
    GridNotFound(String),

    #[error("unknown segmentation mode '{0}' (expected 'score-based' or 'kmeans')")]
    UnknownSegmentMode(String),
}

/// Result type for data-layer operations.
pub type Result<T> = std::result::Result<T, GridError>;

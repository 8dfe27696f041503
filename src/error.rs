use std::path::PathBuf;

use thiserror::Error;

/// Error types for trace parsing and filtering
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace source could not be read at all
    #[error("failed to read trace from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Normal-equations matrix has no usable pivot in `column`
    #[error("degenerate matrix: pivot {pivot:e} in column {column} is below the threshold")]
    DegenerateMatrix { column: usize, pivot: f64 },
    /// Matrix passed to an operation that needs a square one
    #[error("expected a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    /// Trace columns assembled by hand do not line up
    #[error(
        "trace columns differ in length \
         (time={time}, strain={strain}, interferometer={interferometer})"
    )]
    LengthMismatch {
        time: usize,
        strain: usize,
        interferometer: usize,
    },
    /// Configuration file is not valid JSON for `Configuration`
    #[error("invalid configuration file: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}

/// Result type for trace operations
pub type Result<T> = std::result::Result<T, TraceError>;

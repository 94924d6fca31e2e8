use skiff_syntax::OutOfRange;
use std::path::PathBuf;
use thiserror::Error;

/// Why a file could not be analyzed.
///
/// Clone because an analysis result is shared by every query that
/// coalesced onto the same in-flight run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
    #[error("{path} has no package clause")]
    MissingPackage { path: PathBuf },
}

/// Why a position query failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The file is outside every workspace root.
    #[error("{path} is not inside the workspace")]
    UnsupportedLocation { path: PathBuf },
    /// The file is in the workspace but could not be analyzed.
    #[error("failed to analyze {path}: {source}")]
    Resolution {
        path: PathBuf,
        #[source]
        source: AnalysisError,
    },
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),
    #[error("query was cancelled")]
    Cancelled,
}

// ⚠️ Error taxonomy for the linkage pipeline
//
// Only a missing source table is fatal. Data-quality problems never surface
// here: they degrade to empty/zero/None inside the engine and are reported
// through the data quality report instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkageError {
    /// One or more required input tables could not be obtained
    #[error("required source(s) unavailable: {}", .sources.join(", "))]
    SourceUnavailable { sources: Vec<String> },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LinkageError {
    pub fn source_unavailable<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LinkageError::SourceUnavailable {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// True for the only error class that aborts a run by policy
    pub fn is_fatal_source_error(&self) -> bool {
        matches!(self, LinkageError::SourceUnavailable { .. })
    }
}

pub type LinkageResult<T> = std::result::Result<T, LinkageError>;

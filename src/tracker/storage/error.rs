use std::path::PathBuf;

/// Failures of the history document. None of these are repaired automatically: a history file
/// that can't be parsed is reported and left untouched.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("History file {path:?} is corrupted: {details}")]
    CorruptHistory { path: PathBuf, details: String },

    #[error("Stored report for project {name:?} is malformed: {source}")]
    MalformedReport {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl HistoryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Invalid transition of a project's session. The driver never issues these, so seeing one
/// means a bug rather than a runtime condition.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    #[error("Project {name:?} is already tracking entry {identifier}")]
    AlreadyTracking { name: String, identifier: u64 },

    #[error("Project {name:?} has no open entry to stop")]
    NotTracking { name: String },
}

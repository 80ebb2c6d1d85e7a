use std::path::PathBuf;

/// All errors that can be returned by a HistorySource implementation.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No execution with this id (and run id, when given) exists, or its
    /// history is empty.
    #[error(
        "No workflow found with ID '{workflow_id}'. The workflow may have been archived or the ID may be incorrect."
    )]
    NotFound { workflow_id: String },

    /// The namespace itself does not exist.
    #[error("Namespace not found: '{namespace}'. Verify TEMPORAL_NAMESPACE is correct.")]
    NamespaceNotFound { namespace: String },

    /// The backend refused access.
    #[error(
        "Permission denied. The configured credentials don't have read access to namespace '{namespace}'."
    )]
    PermissionDenied { namespace: String },

    /// An exported history could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An exported history is not valid history JSON.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backend could not be reached.
    #[error("history backend unavailable: {0}")]
    Unavailable(String),
}

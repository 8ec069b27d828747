use thiserror::Error;

/// Errors raised while fetching a model repository.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to clone repository {uri}: {reason}")]
    CloneFailed { uri: String, reason: String },

    #[error("Cannot locate the zoo: neither ADVRS_ZOO_HOME nor HOME is set")]
    NoHomeDirectory,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

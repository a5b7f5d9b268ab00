use thiserror::Error;

/// Failures surfaced by the inspector client.
///
/// `Unreachable` is the only expected operational condition; the CLI
/// boundary turns it into a friendly diagnostic and a non-zero exit.
/// Everything else indicates a protocol mismatch or a defect in the remote
/// process and surfaces with its natural detail.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to inspector at: {url}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("inspector response is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),

    #[error("inspector response is missing the {0:?} field")]
    MissingField(&'static str),

    #[error("inspector response field {0:?} is not an object")]
    NotAnObject(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

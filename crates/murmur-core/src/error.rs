//! Error types for the Murmur speech pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Synthesis failed at unit {index}: {source}")]
    Synthesis {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Playback failed to start: {0}")]
    PlaybackStart(String),

    #[error("Cache IO error: {0}")]
    CacheIo(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

/// Coarse classification a caller uses to choose a fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No credential configured, or the service rejected it
    MissingCredential,
    /// Transport-level failure; retrying later may help
    Network,
    /// The service answered with an error
    Upstream,
    /// A player could not be started
    Playback,
    Other,
}

impl Error {
    /// Classify this error, looking through `Synthesis` to the unit failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Auth(_) => FailureKind::MissingCredential,
            Error::Network(_) => FailureKind::Network,
            Error::Upstream { .. } => FailureKind::Upstream,
            Error::PlaybackStart(_) => FailureKind::Playback,
            Error::Synthesis { source, .. } => source.kind(),
            _ => FailureKind::Other,
        }
    }

    pub(crate) fn at_unit(self, index: usize) -> Self {
        Error::Synthesis {
            index,
            source: Box::new(self),
        }
    }
}

/// Shared error type used across all OnThesis crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The dataset upload failed or the server reported a non-success status.
    #[error("dataset upload: {0}")]
    Upload(String),

    /// The turn request could not be issued or yielded no readable stream.
    #[error("stream open: {0}")]
    TransportOpen(String),

    /// The stream broke after it had started delivering frames.
    #[error("stream read: {0}")]
    TransportRead(String),

    #[error("conversation {0} already has a turn in flight")]
    ConversationBusy(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error ends the turn it occurred in.
    ///
    /// Upload failures degrade the turn instead of failing it.
    pub fn is_fatal_to_turn(&self) -> bool {
        !matches!(self, Error::Upload(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No response reached the client (offline, refused, timed out).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service answered with a non-2xx status.
    #[error("Remote error ({status}): {detail}")]
    Remote { status: u16, detail: String },

    /// Rejected locally before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn remote(status: u16, detail: impl Into<String>) -> Self {
        Error::Remote { status, detail: detail.into() }
    }

    /// Status code of a remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::Remote {
                status: status.as_u16(),
                detail: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            },
            None => Error::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

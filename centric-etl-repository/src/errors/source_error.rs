use thiserror::Error;

/// Errors from the paginated source API.
///
/// There is no retry: any of these aborts extraction of the affected table.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be sent or the connection dropped.
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The body was not a valid page.
    #[error("Failed to decode page from {url}: {message}")]
    Decode { url: String, message: String },
}

impl SourceError {
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }
}

use thiserror::Error;

/// Errors from the index registry service.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry request failed: {0}")]
    RequestError(String),

    #[error("Registry returned status {status}: {body}")]
    StatusError { status: u16, body: String },

    #[error("Failed to parse registry response: {0}")]
    ParseError(String),

    #[error("Registry returned an invalid index: {0}")]
    InvalidIndex(String),
}

impl RegistryError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self::RequestError(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NstError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {url}: HTTP {status}: {body}")]
    Api { url: String, status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("API key not set: export {0}")]
    MissingApiKey(String),

    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

impl NstError {
    /// Whether the failure happened on the wire rather than in our input.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. })
    }
}

pub type Result<T> = std::result::Result<T, NstError>;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OtxError>;

#[derive(Debug, Error)]
pub enum OtxError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for OtxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            OtxError::Parse(err.to_string())
        } else {
            OtxError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OtxError {
    fn from(err: serde_json::Error) -> Self {
        OtxError::Parse(err.to_string())
    }
}

// =================================================================
// faucet/errors.rs - Error Types
// =================================================================

use thiserror::Error;

/// Error types for asset requests
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Faucet request timed out")]
    Timeout,

    #[error("Faucet returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid faucet response: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for FaucetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FaucetError::Timeout
        } else if err.is_decode() {
            FaucetError::ParseError(err.to_string())
        } else {
            FaucetError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FaucetError {
    fn from(err: serde_json::Error) -> Self {
        FaucetError::ParseError(err.to_string())
    }
}

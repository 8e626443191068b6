// error.rs

use crate::transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotrError {
    #[error("{0} is a required option")]
    MissingOption(&'static str),

    /// Raised in strict mode for a parameter with no scalar representation.
    #[error("parameter `{key}` has no scalar representation")]
    Encoding { key: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The client was built without an HTTP transport.
    #[error("no HTTP transport configured")]
    NoTransport,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("response format `{0}` cannot be decoded here")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, BotrError>;

impl From<serde_json::Error> for BotrError {
    fn from(err: serde_json::Error) -> Self {
        BotrError::InvalidResponse(err.to_string())
    }
}

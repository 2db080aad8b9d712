//! Error types for serato-core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Base64 decode error: {0}")]
    Base64(String),

    #[error("Binary format error: {0}")]
    BinRw(String),

    #[error("Structure error: {0}")]
    Structure(String),

    #[error("Truncated data: {0}")]
    Truncated(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Container mismatch: {0}")]
    ContainerMismatch(String),

    #[error("String encoding error: {0}")]
    StringEncoding(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        Error::BinRw(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Base64(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

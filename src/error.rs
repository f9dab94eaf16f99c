use thiserror::Error;

use crate::config::ConfigError;
use crate::http::parser::ParserError;
use crate::http::stream::StreamError;
use crate::http::validator::ValidationError;

/// Any failure surfaced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] ParserError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

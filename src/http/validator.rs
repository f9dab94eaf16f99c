//! Validation rules applied when URI components or request targets are set.
//!
//! Every check either accepts its input unchanged or reports a
//! [`ValidationError`]. Normalization (lower-casing, stripping delimiters) is
//! done by the callers in [`uri`](crate::http::uri) and
//! [`request`](crate::http::request).

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("scheme pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid scheme {0:?}")]
    InvalidScheme(String),

    #[error("invalid port {0}: must be between 1 and 65535")]
    InvalidPort(String),

    #[error("unable to parse URI {0:?}")]
    InvalidUri(String),

    #[error("invalid request target {0:?}: cannot contain whitespace")]
    InvalidRequestTarget(String),
}

pub struct Validator;

impl Validator {
    /// An empty scheme is allowed and denotes a relative reference.
    pub fn validate_scheme(scheme: &str) -> Result<(), ValidationError> {
        if scheme.is_empty() || SCHEME.is_match(scheme) {
            Ok(())
        } else {
            Err(ValidationError::InvalidScheme(scheme.to_string()))
        }
    }

    pub fn validate_port(port: u32) -> Result<u16, ValidationError> {
        match u16::try_from(port) {
            Ok(p) if p >= 1 => Ok(p),
            _ => Err(ValidationError::InvalidPort(port.to_string())),
        }
    }

    /// Port digits taken from an authority, of any length.
    pub fn validate_port_digits(port: &str) -> Result<u16, ValidationError> {
        port.parse::<u16>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ValidationError::InvalidPort(port.to_string()))
    }

    pub fn validate_request_target(target: &str) -> Result<(), ValidationError> {
        if target.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidRequestTarget(target.to_string()));
        }
        Ok(())
    }
}

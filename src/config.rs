//! Process-wide defaults for message construction, wire parsing and the
//! query-string codec.
//!
//! A [`Config`] can be installed once with [`set_config`]; afterwards every
//! call to [`config`] returns it. When nothing was installed the built-in
//! defaults are used.

use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

use crate::query::QueryEncoding;

static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to deserialize config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Protocol version given to messages built without an explicit one.
    pub protocol_version: String,

    pub max_start_line_size: usize,
    pub max_header_size: usize,

    /// Decoding applied by [`query::parse_default`](crate::query::parse_default)
    /// and [`Uri::query_data`](crate::http::uri::Uri::query_data).
    pub query_decoding: QueryEncoding,

    /// Encoding applied by [`query::build_default`](crate::query::build_default)
    /// and [`Uri::with_query_data`](crate::http::uri::Uri::with_query_data).
    pub query_encoding: QueryEncoding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol_version: "1.1".to_string(),

            max_start_line_size: 8192,
            max_header_size: 64 * 1024,

            query_decoding: QueryEncoding::Rfc1738,
            query_encoding: QueryEncoding::Rfc3986,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&content)?)
    }

    /// Same as [`Config::load`] but never fails: any error is logged and the
    /// defaults are returned instead.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "fall back to default config");
                Config::default()
            }
        }
    }
}

pub fn set_config(cfg: Config) -> Result<(), ConfigError> {
    CONFIG.set(cfg).map_err(|_| ConfigError::AlreadyInitialized)
}

pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            protocol_version = "1.0"
            query_decoding = "none"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.protocol_version, "1.0");
        assert_eq!(cfg.query_decoding, QueryEncoding::None);
        assert_eq!(cfg.query_encoding, QueryEncoding::Rfc3986);
        assert_eq!(cfg.max_header_size, 64 * 1024);
    }

    #[test]
    fn encoding_names_follow_rfc_numbers() {
        let cfg: Config = toml::from_str("query_encoding = \"rfc1738\"").unwrap();
        assert_eq!(cfg.query_encoding, QueryEncoding::Rfc1738);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn from_file_falls_back_to_defaults() {
        assert_eq!(Config::from_file("/definitely/not/here.toml"), Config::default());
    }

    #[test]
    fn unknown_encoding_is_a_parse_error() {
        assert!(toml::from_str::<Config>("query_encoding = \"base64\"").is_err());
    }
}

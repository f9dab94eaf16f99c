//! URI value used as the target of a [`Request`](crate::http::request::Request).
//!
//! Components are split with the generic-syntax pattern from RFC 3986
//! appendix B, then the authority is broken down into user-info, host and
//! port. Default ports (80 for `http`, 443 for `https`) are kept but never
//! written out by [`Display`](std::fmt::Display).

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::config::config;
use crate::http::validator::{ValidationError, Validator};
use crate::query::{self, ParsedQuery, QueryMap};

static URI_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("URI pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: String,
    user_info: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

impl Uri {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let caps = URI_PARTS
            .captures(s)
            .ok_or_else(|| ValidationError::InvalidUri(s.to_string()))?;
        let part = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        let scheme = part(1);
        Validator::validate_scheme(scheme)?;

        let mut uri = Uri {
            scheme: scheme.to_ascii_lowercase(),
            path: part(3).to_string(),
            query: part(4).to_string(),
            fragment: part(5).to_string(),
            ..Uri::default()
        };

        if let Some(authority) = caps.get(2).map(|m| m.as_str()) {
            let host_port = match authority.rfind('@') {
                Some(at) => {
                    uri.user_info = authority[..at].to_string();
                    &authority[at + 1..]
                }
                None => authority,
            };
            let (host, port) = split_host_port(host_port);
            uri.host = host.to_string();
            uri.port = match port {
                Some(p) if p.bytes().all(|b| b.is_ascii_digit()) => {
                    Some(Validator::validate_port_digits(p)?)
                }
                Some(_) => return Err(ValidationError::InvalidUri(s.to_string())),
                None => None,
            };
        }

        Ok(uri)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn user_info(&self) -> &str {
        &self.user_info
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Whether the port is absent or the default one for the scheme.
    pub fn is_default_port(&self) -> bool {
        self.port.is_none() || self.port == default_port(&self.scheme)
    }

    /// `user-info@host:port`, with the port only when it is not the default
    /// one. Empty when there is no host.
    pub fn authority(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }

        let mut authority = String::new();
        if !self.user_info.is_empty() {
            authority.push_str(&self.user_info);
            authority.push('@');
        }
        authority.push_str(&self.host);
        if let Some(port) = self.port.filter(|_| !self.is_default_port()) {
            authority.push_str(&format!(":{}", port));
        }
        authority
    }

    /// Host plus non-default port, as sent in a `Host` header.
    pub fn host_header(&self) -> String {
        match self.port.filter(|_| !self.is_default_port()) {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    pub fn with_scheme(&self, scheme: &str) -> Result<Self, ValidationError> {
        Validator::validate_scheme(scheme)?;
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            ..self.clone()
        })
    }

    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Self {
        let user_info = match password {
            Some(password) if !password.is_empty() => format!("{}:{}", user, password),
            _ => user.to_string(),
        };
        Self {
            user_info,
            ..self.clone()
        }
    }

    pub fn with_host(&self, host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..self.clone()
        }
    }

    pub fn with_port(&self, port: Option<u32>) -> Result<Self, ValidationError> {
        let port = port.map(Validator::validate_port).transpose()?;
        Ok(Self {
            port,
            ..self.clone()
        })
    }

    /// A non-empty path always starts with `/`.
    pub fn with_path(&self, path: &str) -> Self {
        let path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            path,
            ..self.clone()
        }
    }

    /// A leading `?` is dropped.
    pub fn with_query(&self, query: &str) -> Self {
        Self {
            query: query.strip_prefix('?').unwrap_or(query).to_string(),
            ..self.clone()
        }
    }

    /// A leading `#` is dropped.
    pub fn with_fragment(&self, fragment: &str) -> Self {
        Self {
            fragment: fragment.strip_prefix('#').unwrap_or(fragment).to_string(),
            ..self.clone()
        }
    }

    /// Decodes the query component with the configured decoding.
    pub fn query_data(&self) -> ParsedQuery {
        query::parse(&self.query, config().query_decoding)
    }

    /// Replaces the query component with `data`, encoded with the configured
    /// encoding.
    pub fn with_query_data(&self, data: &QueryMap) -> Self {
        self.with_query(&query::build(data, config().query_encoding))
    }
}

/// Splits `host:port`, leaving IPv6 literals such as `[::1]:80` intact.
fn split_host_port(s: &str) -> (&str, Option<&str>) {
    let port_start = if s.starts_with('[') {
        s.find(']').and_then(|end| s[end + 1..].strip_prefix(':').map(|_| end + 1))
    } else {
        s.rfind(':')
    };

    match port_start {
        Some(colon) => {
            let port = &s[colon + 1..];
            (&s[..colon], (!port.is_empty()).then_some(port))
        }
        None => (s, None),
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }

        let authority = self.authority();
        if !authority.is_empty() {
            write!(f, "//{}", authority)?;
        }

        if !self.path.is_empty() {
            if !self.path.starts_with('/') && (!authority.is_empty() || self.scheme.is_empty()) {
                f.write_str("/")?;
            }
            f.write_str(&self.path)?;
        }

        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

/// Anything a request can be built for: a parsed [`Uri`] or a string.
pub trait IntoUri {
    fn into_uri(self) -> Result<Uri, ValidationError>;
}

impl IntoUri for Uri {
    fn into_uri(self) -> Result<Uri, ValidationError> {
        Ok(self)
    }
}

impl IntoUri for &Uri {
    fn into_uri(self) -> Result<Uri, ValidationError> {
        Ok(self.clone())
    }
}

impl IntoUri for &str {
    fn into_uri(self) -> Result<Uri, ValidationError> {
        Uri::parse(self)
    }
}

impl IntoUri for String {
    fn into_uri(self) -> Result<Uri, ValidationError> {
        Uri::parse(&self)
    }
}

impl IntoUri for &String {
    fn into_uri(self) -> Result<Uri, ValidationError> {
        Uri::parse(self)
    }
}

//! Query-string codec.
//!
//! [`parse`] turns `a=1&b[]=2&b[]=3` into a tree of [`QueryValue`]s and
//! reports whether keys were duplicated and whether only explicit indices
//! were used. [`build`] is the inverse for flat data: it never produces
//! bracket notation.
//!
//! A key without `=` (`foo`) decodes to `Scalar(None)` while `foo=` decodes
//! to `Scalar(Some(""))`; [`build`] keeps the two apart.

mod encoding;
mod parser;

pub use encoding::{Codec, QueryEncoding};
pub use parser::QueryParser;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::config;

pub type QueryMap = IndexMap<String, QueryValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// `None` for a bare key without `=`.
    Scalar(Option<String>),
    List(Vec<QueryValue>),
    Map(QueryMap),
}

impl QueryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Scalar(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Scalar(None))
    }
}

/// Nested values are taken apart with an explicit stack instead of the
/// recursive drop glue, so arbitrarily deep trees can be freed.
impl Drop for QueryValue {
    fn drop(&mut self) {
        let mut pending = match self {
            QueryValue::Scalar(_) => return,
            QueryValue::List(items) => std::mem::take(items),
            QueryValue::Map(children) => children.drain(..).map(|(_, v)| v).collect(),
        };
        while let Some(mut value) = pending.pop() {
            match &mut value {
                QueryValue::Scalar(_) => {}
                QueryValue::List(items) => pending.append(items),
                QueryValue::Map(children) => pending.extend(children.drain(..).map(|(_, v)| v)),
            }
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Scalar(Some(s.to_string()))
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Scalar(Some(s))
    }
}

impl From<Option<&str>> for QueryValue {
    fn from(s: Option<&str>) -> Self {
        QueryValue::Scalar(s.map(str::to_string))
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(items: Vec<T>) -> Self {
        QueryValue::List(items.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub data: QueryMap,
    /// A key appeared more than once, or a scalar had to become a container.
    pub duplicates: bool,
    /// No empty `[]` segment was used.
    pub numeric_indices: bool,
}

pub fn parse(s: &str, encoding: QueryEncoding) -> ParsedQuery {
    QueryParser::new(encoding).parse(s)
}

/// Parses without expanding bracket keys: `a[b]=c` keeps the key `a[b]`.
pub fn parse_flat(s: &str, encoding: QueryEncoding) -> QueryMap {
    QueryParser::new(encoding).parse_flat(s)
}

/// [`parse`] with the configured decoding.
pub fn parse_default(s: &str) -> ParsedQuery {
    parse(s, config().query_decoding)
}

/// Builds a query string from flat data.
///
/// List (and map) values repeat their key once per element. Elements that
/// are themselves containers are skipped.
pub fn build(data: &QueryMap, encoding: QueryEncoding) -> String {
    let encode = encoding.encoder();
    let mut pairs: Vec<String> = Vec::new();

    let mut emit = |key: &str, value: &QueryValue| match value {
        QueryValue::Scalar(None) => pairs.push(key.to_string()),
        QueryValue::Scalar(Some(v)) => pairs.push(format!("{}={}", key, encode(v))),
        _ => tracing::debug!(key, "skipping nested query value"),
    };

    for (key, value) in data {
        let encoded = encode(key);
        let key: &str = &encoded;
        match value {
            QueryValue::Scalar(_) => emit(key, value),
            QueryValue::List(items) => items.iter().for_each(|item| emit(key, item)),
            QueryValue::Map(children) => children.values().for_each(|item| emit(key, item)),
        }
    }

    pairs.join("&")
}

/// [`build`] with the configured encoding.
pub fn build_default(data: &QueryMap) -> String {
    build(data, config().query_encoding)
}

//! HTTP headers abstraction for [`Request`](crate::http::request::Request) and
//! [`Response`](crate::http::response::Response)
//!
//! Headers are stored in an ordered map keyed by the lower-cased name, so
//! lookups are case-insensitive while iteration and serialization follow the
//! order in which distinct names were first inserted. Each entry remembers
//! the spelling the name was last set with, and keeps every value given for
//! it (a header may legitimately appear several times on the wire).
//!
//! The collection is immutable: every mutation returns a new collection. The
//! backing map sits behind an [`Arc`], so copies are cheap and a no-op
//! mutation such as removing an absent header hands back the same storage.
//!
//! This abstraction does not enforce any HTTP semantics. Higher-level types
//! such as [`Request`](crate::http::request::Request) apply their own rules
//! on top of it.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Characters stripped around names and values.
const TRIMMED: &[char] = &[' ', '\t', '\r', '\n', '\0', '\x0B'];

/// Characters stripped around [`parse_header`] keys and values.
const PARAM_TRIMMED: &[char] = &['"', '\'', ' ', '\t', '\r', '\n'];

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HttpHeaders {
    entries: Arc<IndexMap<String, HeaderEntry>>,
}

/// Anything accepted as the value(s) of a header.
pub trait IntoHeaderValues {
    fn into_header_values(self) -> Vec<String>;
}

impl IntoHeaderValues for &str {
    fn into_header_values(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoHeaderValues for String {
    fn into_header_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoHeaderValues for &String {
    fn into_header_values(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoHeaderValues for Vec<String> {
    fn into_header_values(self) -> Vec<String> {
        self
    }
}

impl IntoHeaderValues for Vec<&str> {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoHeaderValues for &[&str] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

impl IntoHeaderValues for &[String] {
    fn into_header_values(self) -> Vec<String> {
        self.to_vec()
    }
}

impl<const N: usize> IntoHeaderValues for [&str; N] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

fn trim(s: &str) -> &str {
    s.trim_matches(TRIMMED)
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from `(name, values)` pairs. A name given twice
    /// (in any casing) keeps the values of the last occurrence.
    pub fn from_pairs<N, V, I>(pairs: I) -> Self
    where
        N: AsRef<str>,
        V: IntoHeaderValues,
        I: IntoIterator<Item = (N, V)>,
    {
        let mut entries = IndexMap::new();
        for (name, values) in pairs {
            Self::insert_entry(&mut entries, name.as_ref(), values.into_header_values());
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Builds a collection from individual header lines. Repeated names
    /// accumulate their values in order.
    pub fn from_lines<N, V, I>(lines: I) -> Self
    where
        N: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (N, V)>,
    {
        let mut entries: IndexMap<String, HeaderEntry> = IndexMap::new();
        for (name, value) in lines {
            let key = trim(name.as_ref()).to_ascii_lowercase();
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.name = trim(name.as_ref()).to_string();
                    entry.values.push(trim(value.as_ref()).to_string());
                }
                None => Self::insert_entry(&mut entries, name.as_ref(), vec![value.as_ref().to_string()]),
            }
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    fn insert_entry(entries: &mut IndexMap<String, HeaderEntry>, name: &str, values: Vec<String>) {
        let name = trim(name);
        let entry = HeaderEntry {
            name: name.to_string(),
            values: values.iter().map(|v| trim(v).to_string()).collect(),
        };
        entries.insert(name.to_ascii_lowercase(), entry);
    }

    /// Replaces every value of `name`.
    pub fn set(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let mut new = self.clone();
        Self::insert_entry(Arc::make_mut(&mut new.entries), name, values.into_header_values());
        new
    }

    /// Adds values after the existing ones, creating the header when absent.
    pub fn append(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let mut current = self.get_all(name).to_vec();
        current.extend(values.into_header_values());
        self.set(name, current)
    }

    /// Sets `name` as the first header of the collection.
    pub fn set_first(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let mut new = self.clone();
        let entries = Arc::make_mut(&mut new.entries);
        let key = trim(name).to_ascii_lowercase();
        entries.shift_remove(&key);

        let mut single = IndexMap::new();
        Self::insert_entry(&mut single, name, values.into_header_values());
        if let Some((key, entry)) = single.pop() {
            entries.shift_insert(0, key, entry);
        }
        new
    }

    pub fn remove(&self, name: &str) -> Self {
        if !self.has(name) {
            return self.clone();
        }
        let mut new = self.clone();
        Arc::make_mut(&mut new.entries).shift_remove(&trim(name).to_ascii_lowercase());
        new
    }

    /// All values joined with `", "`, or an empty string.
    pub fn get(&self, name: &str) -> String {
        self.get_all(name).join(", ")
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&trim(name).to_ascii_lowercase())
            .map(|e| e.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(&trim(name).to_ascii_lowercase())
    }

    /// Name as it was last set, e.g. `Content-Type` for a lookup of `content-type`.
    pub fn original_name(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&trim(name).to_ascii_lowercase())
            .map(|e| e.name.as_str())
    }

    /// Iterates over `(name, values)` in insertion order, names in their
    /// original casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .values()
            .map(|e| (e.name.as_str(), e.values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether both collections share the same backing storage.
    pub fn ptr_eq(&self, other: &HttpHeaders) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Serializes as `Name: v1, v2\r\n` lines.
    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, values) in self.iter() {
            result.push_str(&format!("{}: {}\r\n", name, values.join(", ")));
        }
        result
    }
}

impl PartialEq for HttpHeaders {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.entries == other.entries
    }
}

impl Eq for HttpHeaders {}

impl fmt::Display for HttpHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

/// Splits header values on commas that are not inside a quoted string.
pub fn normalize_header(values: &[String]) -> Vec<String> {
    let mut result = Vec::new();
    for value in values {
        for part in split_unquoted(value, ',') {
            let part = trim(part);
            if !part.is_empty() {
                result.push(part.to_string());
            }
        }
    }
    result
}

/// Parses `;`-separated header parameters, e.g.
/// `<http://foo.com>; rel="front"; type="image/jpeg"`.
///
/// Every comma-separated value yields one ordered list of `(key, value)`
/// pairs. A parameter without `=` is returned with an empty key.
pub fn parse_header(values: &[String]) -> Vec<Vec<(String, String)>> {
    let mut params = Vec::new();
    for value in normalize_header(values) {
        let mut part = Vec::new();
        for kvp in split_unquoted(&value, ';') {
            let kvp = kvp.trim_matches(PARAM_TRIMMED);
            if kvp.is_empty() {
                continue;
            }
            if kvp.starts_with('<') && kvp.ends_with('>') {
                part.push((String::new(), kvp.to_string()));
                continue;
            }
            match kvp.split_once('=') {
                Some((k, v)) => part.push((
                    k.trim_matches(PARAM_TRIMMED).to_string(),
                    v.trim_matches(PARAM_TRIMMED).to_string(),
                )),
                None => part.push((String::new(), kvp.to_string())),
            }
        }
        if !part.is_empty() {
            params.push(part);
        }
    }
    params
}

fn split_unquoted(s: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == delim && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let h = HttpHeaders::new().set("Content-Type", "text/html");
        assert!(h.has("content-type"));
        assert!(h.has("CONTENT-TYPE"));
        assert_eq!(h.get("content-TYPE"), h.get("Content-Type"));
        assert_eq!(h.get("content-type"), "text/html");
    }

    #[test]
    fn set_replaces_and_records_latest_casing() {
        let h = HttpHeaders::new()
            .set("x-foo", "a")
            .set("X-Foo", ["b", "c"]);
        assert_eq!(h.get_all("x-foo"), ["b", "c"]);
        assert_eq!(h.original_name("x-foo"), Some("X-Foo"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn values_are_trimmed() {
        let h = HttpHeaders::new().set(" foo ", vec!["baz ", " bar\t"]);
        assert_eq!(h.get("foo"), "baz, bar");
        assert_eq!(h.get_all("foo"), ["baz", "bar"]);
        assert_eq!(h.original_name("foo"), Some("foo"));
    }

    #[test]
    fn append_extends_existing_values() {
        let h = HttpHeaders::new().append("foo", ["baz", "bar"]);
        assert_eq!(h.get("foo"), "baz, bar");

        let h2 = h.append("FOO", "qux");
        assert_eq!(h2.get_all("foo"), ["baz", "bar", "qux"]);
        assert_eq!(h.get_all("foo"), ["baz", "bar"]);
    }

    #[test]
    fn order_follows_first_insertion_of_names() {
        let h = HttpHeaders::new()
            .set("A", "1")
            .set("B", "2")
            .append("a", "3")
            .set("C", "4");
        let names: Vec<&str> = h.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "B", "C"]);
        assert_eq!(h.stringify(), "a: 1, 3\r\nB: 2\r\nC: 4\r\n");
    }

    #[test]
    fn remove_absent_shares_storage() {
        let h = HttpHeaders::new().set("Foo", "bar");
        let same = h.remove("baz");
        assert!(same.ptr_eq(&h));

        let removed = h.remove("FOO");
        assert!(!removed.has("foo"));
        assert!(h.has("foo"));
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let h = HttpHeaders::from_pairs([("A", "1"), ("B", "2"), ("C", "3")]).remove("b");
        let names: Vec<&str> = h.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[test]
    fn missing_header_reads_empty() {
        let h = HttpHeaders::new();
        assert_eq!(h.get("nope"), "");
        assert!(h.get_all("nope").is_empty());
        assert!(!h.has("nope"));
    }

    #[test]
    fn set_first_moves_header_to_front() {
        let h = HttpHeaders::from_pairs([("Foo", "1"), ("host", "old")]).set_first("Host", "new");
        let names: Vec<&str> = h.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Host", "Foo"]);
        assert_eq!(h.get("host"), "new");
    }

    #[test]
    fn normalizes_comma_separated_values() {
        let values = vec!["a, b".to_string(), "\"c, d\", e".to_string()];
        assert_eq!(normalize_header(&values), ["a", "b", "\"c, d\"", "e"]);
    }

    #[test]
    fn parses_header_parameters() {
        let values = vec![
            "<http:/.../front.jpeg>; rel=\"front\"; type=\"image/jpeg\", <http://.../back.jpeg>; rel=back"
                .to_string(),
        ];
        let parsed = parse_header(&values);
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[0],
            vec![
                (String::new(), "<http:/.../front.jpeg>".to_string()),
                ("rel".to_string(), "front".to_string()),
                ("type".to_string(), "image/jpeg".to_string()),
            ]
        );
        assert_eq!(parsed[1][1], ("rel".to_string(), "back".to_string()));
    }
}

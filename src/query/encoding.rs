//! Percent-encoding flavours used for query-string keys and values.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Deserialize;
use std::borrow::Cow;

/// How query-string keys and values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryEncoding {
    /// Keys and values are used as-is.
    None,

    /// Percent-encoding only. `+` is a literal plus sign.
    Rfc3986,

    /// Percent-encoding plus `+` for spaces (form encoding).
    Rfc1738,
}

pub type Codec = fn(&str) -> Cow<'_, str>;

impl QueryEncoding {
    pub fn decoder(self) -> Codec {
        match self {
            QueryEncoding::None => passthrough,
            QueryEncoding::Rfc3986 => raw_url_decode,
            QueryEncoding::Rfc1738 => url_decode,
        }
    }

    pub fn encoder(self) -> Codec {
        match self {
            QueryEncoding::None => passthrough,
            QueryEncoding::Rfc3986 => raw_url_encode,
            QueryEncoding::Rfc1738 => url_encode,
        }
    }
}

fn passthrough(s: &str) -> Cow<'_, str> {
    Cow::Borrowed(s)
}

fn raw_url_decode(s: &str) -> Cow<'_, str> {
    percent_decode(s, false)
}

fn url_decode(s: &str) -> Cow<'_, str> {
    percent_decode(s, true)
}

fn raw_url_encode(s: &str) -> Cow<'_, str> {
    percent_encode(s, false)
}

fn url_encode(s: &str) -> Cow<'_, str> {
    percent_encode(s, true)
}

/// Left alone by RFC 3986 encoding: letters, digits and `-_.~`.
const RFC3986_ESCAPED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Form encoding also escapes `~`.
const RFC1738_ESCAPED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Decodes `%XX` sequences. Malformed sequences are kept verbatim, and a
/// component whose decoded bytes are not UTF-8 is returned undecoded.
fn percent_decode(s: &str, plus_as_space: bool) -> Cow<'_, str> {
    if !s.contains('%') && !(plus_as_space && s.contains('+')) {
        return Cow::Borrowed(s);
    }

    let spaced = if plus_as_space {
        s.replace('+', " ")
    } else {
        s.to_string()
    };
    match percent_decode_str(&spaced).decode_utf8() {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => {
            tracing::debug!(component = s, "keeping query component that does not decode to UTF-8");
            Cow::Borrowed(s)
        }
    }
}

fn percent_encode(s: &str, form: bool) -> Cow<'_, str> {
    let set = if form { RFC1738_ESCAPED } else { RFC3986_ESCAPED };
    let encoded: Cow<'_, str> = utf8_percent_encode(s, set).into();
    if form && encoded.contains("%20") {
        Cow::Owned(encoded.replace("%20", "+"))
    } else {
        encoded
    }
}

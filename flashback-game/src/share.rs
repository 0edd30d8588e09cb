//! Shareable event-set tokens.
//!
//! A token is the JSON array of `{name, date}` records compressed with the
//! LZ-String "encoded URI component" scheme, or the literal `EMPTY` for an
//! intentionally empty set. Tokens travel in a single URL query parameter.
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

use crate::event::Event;

/// Token emitted for an empty event set.
pub const EMPTY_TOKEN: &str = "EMPTY";

/// Default query parameter carrying the token.
pub const SHARE_PARAM: &str = "events";

const TOKEN_ALPHABET_EXTRA: &[char] = &['+', '-', '$', ' '];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorruptReason {
    /// Characters outside the token alphabet.
    InvalidCharacters,
    Decompression,
    EmptyPayload,
    InvalidJson,
    NotAnArray,
    InvalidEvent { index: usize },
}

impl fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCharacters => f.write_str("token contains invalid characters"),
            Self::Decompression => f.write_str("token could not be decompressed"),
            Self::EmptyPayload => f.write_str("token decompressed to an empty payload"),
            Self::InvalidJson => f.write_str("payload is not valid JSON"),
            Self::NotAnArray => f.write_str("payload is not a JSON array"),
            Self::InvalidEvent { index } => write!(f, "payload entry {index} is not a valid event"),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShareError {
    #[error("corrupt share link: {0}")]
    Corrupt(CorruptReason),
}

/// Encode an event set into a URL-safe token.
#[must_use]
pub fn encode(events: &[Event]) -> String {
    if events.is_empty() {
        return EMPTY_TOKEN.to_string();
    }
    // Serializing plain name/date strings cannot fail.
    let json = serde_json::to_string(events).unwrap_or_else(|_| String::from("[]"));
    lz_str::compress_to_encoded_uri_component(json.as_str())
}

/// Decode a token back into its event set.
///
/// # Errors
///
/// Returns [`ShareError::Corrupt`] for any token that does not decode to a
/// JSON array of valid events.
pub fn decode(token: &str) -> Result<Vec<Event>, ShareError> {
    // Spaces are kept: they stand for '+' characters.
    let token = token.trim_matches(|c: char| c.is_whitespace() && c != ' ');
    if token == EMPTY_TOKEN {
        return Ok(Vec::new());
    }
    if token.is_empty() {
        return Err(ShareError::Corrupt(CorruptReason::EmptyPayload));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || TOKEN_ALPHABET_EXTRA.contains(&c))
    {
        return Err(ShareError::Corrupt(CorruptReason::InvalidCharacters));
    }

    // Query parsers turn '+' into a space.
    let restored = token.replace(' ', "+");
    let wide = lz_str::decompress_from_encoded_uri_component(restored.as_str())
        .ok_or(ShareError::Corrupt(CorruptReason::Decompression))?;
    let json =
        String::from_utf16(&wide).map_err(|_| ShareError::Corrupt(CorruptReason::Decompression))?;
    if json.trim().is_empty() {
        return Err(ShareError::Corrupt(CorruptReason::EmptyPayload));
    }

    let value: Value =
        serde_json::from_str(&json).map_err(|_| ShareError::Corrupt(CorruptReason::InvalidJson))?;
    let Value::Array(items) = value else {
        return Err(ShareError::Corrupt(CorruptReason::NotAnArray));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<Event>(item)
                .map_err(|_| ShareError::Corrupt(CorruptReason::InvalidEvent { index }))
        })
        .collect()
}

/// Split `url` into the part before the query, the query and the fragment.
///
/// The fragment is cut first, so a `?` inside it never starts a query.
fn split_url(url: &str) -> (&str, Option<&str>, Option<&str>) {
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    match head.split_once('?') {
        Some((base, query)) => (base, Some(query), fragment),
        None => (head, None, fragment),
    }
}

/// Percent-decode one query component. Escapes that do not form UTF-8 leave
/// the text as it was, which the token alphabet check then rejects.
fn decode_component(text: &str) -> Cow<'_, str> {
    percent_decode_str(text)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(text))
}

fn query_key(pair: &str) -> Cow<'_, str> {
    decode_component(pair.split_once('=').map_or(pair, |(key, _)| key))
}

/// Percent-decoded value of `param` in the query string of `url`, if present.
///
/// `+` is left alone; [`decode`] already reads a space as `+`.
#[must_use]
pub fn query_value<'a>(url: &'a str, param: &str) -> Option<Cow<'a, str>> {
    let (_, query, _) = split_url(url);
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| decode_component(key) == param)
        .map(|(_, value)| decode_component(value))
}

/// `url` with `param` removed from its query string.
#[must_use]
pub fn strip_param(url: &str, param: &str) -> String {
    let (base, query, fragment) = split_url(url);
    let kept: Vec<&str> = query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| query_key(pair) != param)
        .collect();
    let mut out = base.to_string();
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Build a link to `base_url` carrying `events` in `param`.
#[must_use]
pub fn share_url(base_url: &str, param: &str, events: &[Event]) -> String {
    let base = strip_param(base_url, param);
    let token = encode(events);
    let (path, fragment) = match base.split_once('#') {
        Some((p, f)) => (p.to_string(), Some(f.to_string())),
        None => (base, None),
    };
    let separator = if path.contains('?') { '&' } else { '?' };
    let mut url = format!("{path}{separator}{param}={token}");
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(&fragment);
    }
    url
}

//! Encoders and decoders for [`QueryParams`](crate::model::QueryParams).
//!
//! Two targets share one model:
//! - [`request`]: the flat request understood by the OLAP data server,
//!   addressing levels by bare name.
//! - [`permalink`]: bookmarkable URL search params, addressing levels by
//!   full name and carrying UI-only state.
//!
//! Both decoders resolve names against cube metadata. Cuts on unknown levels
//! are dropped; drilldowns on unknown levels are a hard
//! [`CodecError::UnknownLevel`], since silently dropping one would change the
//! shape of the result.

pub mod filter;
pub mod permalink;
pub mod request;

use std::borrow::Cow;

use thiserror::Error;

use crate::schema::FullNameError;

pub use filter::{format_filter_token, parse_filter_token, FilterToken};
pub use permalink::{parse_permalink, serialize_permalink};
pub use request::{from_request, parse_request, to_request, to_request_with, FlatRequest};

/// Errors raised while decoding requests and permalinks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("level '{level}' does not exist in cube '{cube}'")]
    UnknownLevel { cube: String, level: String },

    #[error(transparent)]
    MalformedFullName(#[from] FullNameError),

    #[error("malformed cut '{0}'")]
    MalformedCut(String),

    #[error("malformed filter '{0}'")]
    MalformedFilter(String),

    #[error("malformed pagination '{0}'")]
    MalformedPagination(String),

    #[error("malformed sort '{0}'")]
    MalformedSort(String),

    #[error("malformed boolean flags '{0}'")]
    MalformedBooleans(String),

    #[error("query targets cube '{found}' but metadata is for '{expected}'")]
    CubeMismatch { expected: String, found: String },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Decode a URL query string into key/value pairs, tolerating a leading `?`.
pub fn search_pairs(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Escape the list delimiters `,` and `;`, and `\` itself, in a list item.
pub(crate) fn escape_item(item: &str) -> Cow<'_, str> {
    if item.contains([',', ';', '\\']) {
        let mut escaped = String::with_capacity(item.len() + 2);
        for c in item.chars() {
            if matches!(c, ',' | ';' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(item)
    }
}

/// Split a list on unescaped commas, undoing [`escape_item`]. Empty items
/// are dropped.
pub(crate) fn split_escaped(list: &str) -> Vec<String> {
    let mut items = split_escaped_all(list);
    items.retain(|item| !item.is_empty());
    items
}

/// Like [`split_escaped`], but keeps empty items so positions are preserved.
pub(crate) fn split_escaped_all(list: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = list.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);
    items
}

/// Split on `delimiter` where it is not escaped, keeping escapes in place
/// for a later [`split_escaped`]. Blank segments are skipped.
pub(crate) fn split_unescaped(value: &str, delimiter: char) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            c if c == delimiter => {
                segments.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);
    segments.retain(|segment| !segment.trim().is_empty());
    segments
}

/// Split a delimited field, skipping empty segments.
pub(crate) fn split_list(value: &str, delimiter: char) -> impl Iterator<Item = &str> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

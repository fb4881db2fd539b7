//! Query string decoding.
//!
//! Decodes `application/x-www-form-urlencoded` pairs into a nested
//! structure:
//!
//! - `a=1&b=2` gives two plain values, later plain keys replace earlier ones
//! - `+` decodes to a space, `%XX` escapes must be two hex digits
//! - `list[]=1&list[]=2` builds an ordered list
//! - `user[name]=x&user[age]=3` builds a nested map
//!
//! A key whose brackets do not form a well-formed `root[a][b]` sequence is
//! kept as a plain key, brackets included. Keys nested deeper than the
//! configured depth are rejected with [`QueryError::TooDeep`].

use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

/// Default maximum number of `[key]` levels in one query key.
pub const DEFAULT_QUERY_DEPTH: usize = 32;

/// Errors raised while decoding a query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A `%` was not followed by two hex digits.
    #[error("invalid percent escape in {component:?}")]
    InvalidEscape {
        /// The raw key or value containing the escape.
        component: String,
    },

    /// The decoded bytes are not valid UTF-8.
    #[error("invalid UTF-8 in {component:?}")]
    InvalidUtf8 {
        /// The raw key or value.
        component: String,
    },

    /// The query string is longer than the configured limit.
    #[error("query string is {length} bytes, the limit is {limit}")]
    TooLong {
        /// Length of the query string in bytes.
        length: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A key has more bracket levels than the configured depth.
    #[error("query key {root:?} is nested {depth} levels deep, the limit is {limit}")]
    TooDeep {
        /// The key before its first bracket.
        root: String,
        /// Bracket levels found.
        depth: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// One decoded query value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// A plain string.
    Str(String),
    /// Values collected from `key[]` pairs, in order.
    List(Vec<String>),
    /// Values collected from `key[sub]` pairs.
    Map(QueryParams),
}

impl QueryValue {
    /// Returns the string if this is a plain value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the nested map if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&QueryParams> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// Decoded query parameters, in first-seen key order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct QueryParams(IndexMap<String, QueryValue>);

impl QueryParams {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    /// Returns the plain string under `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(QueryValue::as_str)
    }

    /// Returns the number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no keys were decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates top-level entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert_path(&mut self, path: &[KeyPart<'_>], value: String) {
        let Some((KeyPart::Key(head), rest)) = path.split_first() else {
            return;
        };
        let head = (*head).to_string();

        match rest.first() {
            None => {
                self.0.insert(head, QueryValue::Str(value));
            }
            Some(KeyPart::Push) => match self.0.get_mut(&head) {
                Some(QueryValue::List(items)) => items.push(value),
                _ => {
                    self.0.insert(head, QueryValue::List(vec![value]));
                }
            },
            Some(KeyPart::Key(_)) => {
                let slot = self
                    .0
                    .entry(head)
                    .or_insert_with(|| QueryValue::Map(QueryParams::new()));
                if !matches!(slot, QueryValue::Map(_)) {
                    *slot = QueryValue::Map(QueryParams::new());
                }
                if let QueryValue::Map(map) = slot {
                    map.insert_path(rest, value);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPart<'a> {
    Key(&'a str),
    Push,
}

/// Decodes `query`, rejecting input longer than `limit` bytes or keys
/// nested deeper than [`DEFAULT_QUERY_DEPTH`].
///
/// # Example
///
/// ```
/// use plumb_core::query::decode;
///
/// let params = decode("name=ada+lovelace&tags[]=math&tags[]=poetry", 1024).unwrap();
/// assert_eq!(params.get_str("name"), Some("ada lovelace"));
/// assert_eq!(params.get("tags").and_then(|v| v.as_list()).map(<[String]>::len), Some(2));
/// ```
pub fn decode(query: &str, limit: usize) -> Result<QueryParams, QueryError> {
    decode_with_depth(query, limit, DEFAULT_QUERY_DEPTH)
}

/// Decodes `query`, rejecting input longer than `limit` bytes or keys with
/// more than `depth` bracket levels.
pub fn decode_with_depth(
    query: &str,
    limit: usize,
    depth: usize,
) -> Result<QueryParams, QueryError> {
    if query.len() > limit {
        return Err(QueryError::TooLong {
            length: query.len(),
            limit,
        });
    }

    let mut params = QueryParams::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(raw_key)?;
        if key.is_empty() {
            continue;
        }
        let value = decode_component(raw_value)?.into_owned();

        match split_key(&*key) {
            Some(path) if path.len() - 1 > depth => {
                let root = match path[0] {
                    KeyPart::Key(root) => root.to_string(),
                    KeyPart::Push => String::new(),
                };
                return Err(QueryError::TooDeep {
                    root,
                    depth: path.len() - 1,
                    limit: depth,
                });
            }
            Some(path) => params.insert_path(&path, value),
            None => params.insert_path(&[KeyPart::Key(&*key)], value),
        }
    }
    Ok(params)
}

fn decode_component(raw: &str) -> Result<Cow<'_, str>, QueryError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(QueryError::InvalidEscape {
                    component: raw.to_string(),
                });
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    if !spaced.contains('%') {
        return Ok(spaced);
    }

    urlencoding::decode(&spaced)
        .map(|decoded| Cow::Owned(decoded.into_owned()))
        .map_err(|_| QueryError::InvalidUtf8 {
            component: raw.to_string(),
        })
}

/// Splits `root[a][b]` into parts. Returns `None` for keys without a
/// well-formed bracket suffix.
fn split_key(key: &str) -> Option<Vec<KeyPart<'_>>> {
    let open = key.find('[')?;
    let root = &key[..open];
    if root.is_empty() {
        return None;
    }

    let mut parts = vec![KeyPart::Key(root)];
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let name = &inner[..close];
        if name.contains('[') {
            return None;
        }
        parts.push(if name.is_empty() {
            KeyPart::Push
        } else {
            KeyPart::Key(name)
        });
        rest = &inner[close + 1..];
    }

    // `[]` only makes sense as the last part.
    let pushes_before_end = parts[..parts.len() - 1].contains(&KeyPart::Push);
    if pushes_before_end {
        return None;
    }
    Some(parts)
}

//! Route pattern compilation.
//!
//! Patterns are `/`-separated; empty segments are ignored.
//!
//! | Syntax      | Matches                                          | Binds          |
//! |-------------|--------------------------------------------------|----------------|
//! | `users`     | exactly `users`                                  | nothing        |
//! | `:id`       | any one segment                                  | `id`           |
//! | `user-:id`  | one segment starting with `user-`                | `id` = the rest|
//! | `_`, `:_id` | any one segment                                  | nothing        |
//! | `*rest`     | zero or more trailing segments                   | `rest` as list |
//! | `*`, `*_x`  | zero or more trailing segments                   | nothing        |

use crate::error::RouteError;
use plumb_core::{ParamValue, PathParams};

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal segment.
    Literal(String),
    /// Any one segment, optionally bound to a name.
    Capture(Option<String>),
    /// A segment starting with `prefix`; the rest is optionally bound.
    Prefixed {
        /// Literal part of the segment.
        prefix: String,
        /// Name bound to the rest of the segment.
        name: Option<String>,
    },
    /// Zero or more trailing segments, optionally bound.
    Glob(Option<String>),
}

impl Segment {
    fn name(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Capture(name) | Self::Prefixed { name, .. } | Self::Glob(name) => {
                name.as_deref()
            }
        }
    }
}

/// A compiled route pattern.
///
/// # Example
///
/// ```
/// use plumb_router::Pattern;
///
/// let pattern = Pattern::parse("/users/:id/files/*path").unwrap();
/// let path = ["users", "7", "files", "a", "b"];
///
/// assert!(pattern.matches(&path));
/// let (params, consumed) = pattern.bind(&path);
/// assert_eq!(params.segment("id"), Some("7"));
/// assert_eq!(consumed, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compiles `source`.
    pub fn parse(source: &str) -> Result<Self, RouteError> {
        let raw: Vec<&str> = source.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw.len());

        for (i, s) in raw.iter().enumerate() {
            let segment = parse_segment(source, s)?;
            if matches!(segment, Segment::Glob(_)) && i + 1 != raw.len() {
                return Err(RouteError::invalid(
                    source,
                    format!("glob {s:?} must be the last segment"),
                ));
            }
            segments.push(segment);
        }

        let mut names: Vec<&str> = Vec::new();
        for name in segments.iter().filter_map(Segment::name) {
            if names.contains(&name) {
                return Err(RouteError::invalid(
                    source,
                    format!("capture {name:?} is bound more than once"),
                ));
            }
            names.push(name);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Compiles a forward prefix: `source` followed by an anonymous glob.
    pub(crate) fn parse_forward(source: &str) -> Result<Self, RouteError> {
        let mut pattern = Self::parse(source)?;
        if pattern.has_glob() {
            return Err(RouteError::invalid(
                source,
                "a forward path cannot contain a glob",
            ));
        }
        pattern.segments.push(Segment::Glob(None));
        Ok(pattern)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the pattern ends with a glob.
    pub fn has_glob(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Glob(_)))
    }

    /// Returns true if `path` matches this pattern.
    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let fixed = self.fixed_len();
        if self.has_glob() {
            if path.len() < fixed {
                return false;
            }
        } else if path.len() != fixed {
            return false;
        }
        self.segments[..fixed]
            .iter()
            .zip(path)
            .all(|(segment, s)| segment_matches(segment, s.as_ref()))
    }

    /// Binds captures against a matching `path`.
    ///
    /// Returns the bound parameters and the number of leading segments
    /// consumed by non-glob segments.
    pub fn bind<S: AsRef<str>>(&self, path: &[S]) -> (PathParams, usize) {
        let mut params = PathParams::new();
        let fixed = self.fixed_len().min(path.len());

        for (segment, s) in self.segments.iter().zip(path) {
            let s = s.as_ref();
            match segment {
                Segment::Capture(Some(name)) => {
                    params.insert(name.clone(), ParamValue::Segment(s.to_string()));
                }
                Segment::Prefixed {
                    prefix,
                    name: Some(name),
                } => {
                    let rest = s.strip_prefix(prefix.as_str()).unwrap_or_default();
                    params.insert(name.clone(), ParamValue::Segment(rest.to_string()));
                }
                _ => {}
            }
        }

        if let Some(Segment::Glob(Some(name))) = self.segments.last() {
            let rest = path[fixed..]
                .iter()
                .map(|s| s.as_ref().to_string())
                .collect();
            params.insert(name.clone(), ParamValue::Glob(rest));
        }

        (params, fixed)
    }

    fn fixed_len(&self) -> usize {
        if self.has_glob() {
            self.segments.len() - 1
        } else {
            self.segments.len()
        }
    }
}

pub(crate) fn segment_matches(segment: &Segment, s: &str) -> bool {
    match segment {
        Segment::Literal(lit) => lit == s,
        Segment::Capture(_) => true,
        Segment::Prefixed { prefix, .. } => s.starts_with(prefix.as_str()),
        Segment::Glob(_) => false,
    }
}

fn parse_segment(source: &str, s: &str) -> Result<Segment, RouteError> {
    if let Some(name) = s.strip_prefix('*') {
        return Ok(Segment::Glob(binding(source, name, true)?));
    }
    if s == "_" {
        return Ok(Segment::Capture(None));
    }
    if let Some(name) = s.strip_prefix(':') {
        return Ok(Segment::Capture(binding(source, name, false)?));
    }

    if let Some(star) = s.find('*') {
        return Err(RouteError::invalid(
            source,
            format!("segment {s:?} has `*` at position {star}; globs must start a segment"),
        ));
    }
    if let Some((prefix, name)) = s.split_once(':') {
        return Ok(Segment::Prefixed {
            prefix: prefix.to_string(),
            name: binding(source, name, false)?,
        });
    }
    Ok(Segment::Literal(s.to_string()))
}

/// Validates a capture name; names starting with `_` bind nothing.
fn binding(source: &str, name: &str, allow_empty: bool) -> Result<Option<String>, RouteError> {
    if name.is_empty() {
        if allow_empty {
            return Ok(None);
        }
        return Err(RouteError::invalid(source, "capture name is empty"));
    }
    if !is_identifier(name) {
        return Err(RouteError::invalid(
            source,
            format!("{name:?} is not a valid capture name"),
        ));
    }
    if name.starts_with('_') {
        return Ok(None);
    }
    Ok(Some(name.to_string()))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(s: &str) -> Segment {
        Segment::Literal(s.to_string())
    }

    fn cap(s: &str) -> Segment {
        Segment::Capture(Some(s.to_string()))
    }

    #[test]
    fn test_parse_literals_and_captures() {
        let pattern = Pattern::parse("/users/:id//edit/").unwrap();
        assert_eq!(pattern.segments(), &[seg("users"), cap("id"), seg("edit")]);
        assert_eq!(pattern.as_str(), "/users/:id//edit/");
    }

    #[test]
    fn test_parse_wildcards() {
        let pattern = Pattern::parse("/_/:_ignored/*").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Capture(None),
                Segment::Capture(None),
                Segment::Glob(None)
            ]
        );

        let pattern = Pattern::parse("/files/*_rest").unwrap();
        assert_eq!(pattern.segments()[1], Segment::Glob(None));
    }

    #[test]
    fn test_parse_prefixed_capture() {
        let pattern = Pattern::parse("/user-:id").unwrap();
        assert_eq!(
            pattern.segments(),
            &[Segment::Prefixed {
                prefix: "user-".to_string(),
                name: Some("id".to_string())
            }]
        );
    }

    #[test]
    fn test_root_pattern_is_empty() {
        let pattern = Pattern::parse("/").unwrap();
        assert!(pattern.segments().is_empty());
        assert!(pattern.matches::<&str>(&[]));
        assert!(!pattern.matches(&["x"]));
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in [
            "/files/*rest/more",
            "/users/:",
            "/users/:1d",
            "/users/:id-x",
            "/a/:id/b/:id",
            "/a/:id/*id",
            "/foo*bar",
            "/pre-:",
            "/*bad-name",
        ] {
            assert!(
                matches!(Pattern::parse(bad), Err(RouteError::InvalidPattern { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_anonymous_names_may_repeat() {
        assert!(Pattern::parse("/:_a/:_a/_/_").is_ok());
    }

    #[test]
    fn test_forward_pattern() {
        let pattern = Pattern::parse_forward("/api/:version").unwrap();
        assert!(pattern.has_glob());
        assert!(pattern.matches(&["api", "v1"]));
        assert!(pattern.matches(&["api", "v1", "users", "3"]));
        assert!(!pattern.matches(&["api"]));

        assert!(Pattern::parse_forward("/api/*rest").is_err());
    }

    #[test]
    fn test_bind_glob() {
        let pattern = Pattern::parse("/files/*rest").unwrap();
        let (params, consumed) = pattern.bind(&["files", "a", "b", "c"]);
        assert_eq!(
            params.glob("rest"),
            Some(&["a".to_string(), "b".to_string(), "c".to_string()][..])
        );
        assert_eq!(consumed, 1);

        let (params, _) = pattern.bind(&["files"]);
        assert_eq!(params.glob("rest"), Some(&[][..]));
    }

    #[test]
    fn test_bind_prefixed_and_anonymous() {
        let pattern = Pattern::parse("/user-:id/_/:_skip").unwrap();
        let (params, consumed) = pattern.bind(&["user-42", "x", "y"]);
        assert_eq!(params.segment("id"), Some("42"));
        assert_eq!(params.len(), 1);
        assert_eq!(consumed, 3);

        let (params, _) = pattern.bind(&["user-", "x", "y"]);
        assert_eq!(params.segment("id"), Some(""));
    }

    #[test]
    fn test_matches() {
        let pattern = Pattern::parse("/users/:id").unwrap();
        assert!(pattern.matches(&["users", "1"]));
        assert!(!pattern.matches(&["users"]));
        assert!(!pattern.matches(&["users", "1", "2"]));
        assert!(!pattern.matches(&["posts", "1"]));
    }
}

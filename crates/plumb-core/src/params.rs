//! Path parameters bound by the router.
//!
//! Captures are stored in a small vector so the common case of one to four
//! parameters never touches the heap for the container itself.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline.
const INLINE_PARAMS: usize = 4;

/// The value bound to one path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A single captured segment (`:name`).
    Segment(String),
    /// All trailing segments captured by a glob (`*name`).
    Glob(Vec<String>),
}

impl ParamValue {
    /// Returns the segment if this is a single-segment capture.
    #[must_use]
    pub fn as_segment(&self) -> Option<&str> {
        match self {
            Self::Segment(s) => Some(s),
            Self::Glob(_) => None,
        }
    }

    /// Returns the segments if this is a glob capture.
    #[must_use]
    pub fn as_glob(&self) -> Option<&[String]> {
        match self {
            Self::Glob(segments) => Some(segments),
            Self::Segment(_) => None,
        }
    }
}

/// Named path parameters, in binding order.
///
/// # Example
///
/// ```rust
/// use plumb_core::{ParamValue, PathParams};
///
/// let mut params = PathParams::new();
/// params.insert("id", ParamValue::Segment("42".into()));
/// params.insert("rest", ParamValue::Glob(vec!["a".into(), "b".into()]));
///
/// assert_eq!(params.segment("id"), Some("42"));
/// assert_eq!(params.glob("rest"), Some(&["a".to_string(), "b".to_string()][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams {
    inner: SmallVec<[(String, ParamValue); INLINE_PARAMS]>,
}

impl PathParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier binding of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(slot) = self.inner.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.inner.push((name, value));
        }
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.inner.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns a single-segment capture by name.
    #[must_use]
    pub fn segment(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_segment)
    }

    /// Returns a glob capture by name.
    #[must_use]
    pub fn glob(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(ParamValue::as_glob)
    }

    /// Merges `other` into `self`; bindings in `other` win.
    pub fn merge(&mut self, other: PathParams) {
        for (name, value) in other.inner {
            self.insert(name, value);
        }
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl FromIterator<(String, ParamValue)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

//! Method-keyed trie index.

use crate::node::Node;
use crate::pattern::Segment;
use http::Method;
use std::collections::HashMap;

/// One trie per method, plus one for rules that apply to every method.
///
/// `HEAD` lookups also consult the `GET` trie. All tries share one running
/// best index, so the earliest declared rule wins across them.
#[derive(Debug, Clone, Default)]
pub(crate) struct MethodIndex {
    by_method: HashMap<Method, Node>,
    any: Node,
}

impl MethodIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts `rule`; `None` means every method.
    pub(crate) fn insert(&mut self, method: Option<&Method>, segments: &[Segment], rule: usize) {
        match method {
            Some(method) => self
                .by_method
                .entry(method.clone())
                .or_default()
                .insert(segments, rule),
            None => self.any.insert(segments, rule),
        }
    }

    /// Finds the earliest declared rule for `method` and `path`.
    pub(crate) fn find<S: AsRef<str>>(&self, method: &Method, path: &[S]) -> Option<usize> {
        let mut best = usize::MAX;

        if let Some(node) = self.by_method.get(method) {
            node.find_into(path, &mut best);
        }
        if *method == Method::HEAD {
            if let Some(node) = self.by_method.get(&Method::GET) {
                node.find_into(path, &mut best);
            }
        }
        self.any.find_into(path, &mut best);

        (best != usize::MAX).then_some(best)
    }

    /// Returns true if no rule was inserted.
    pub(crate) fn is_empty(&self) -> bool {
        self.any.is_empty() && self.by_method.values().all(Node::is_empty)
    }
}

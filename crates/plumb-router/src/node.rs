//! Segment trie.
//!
//! Each node stands for one path position. Rules are stored by their
//! declaration index, and every node remembers the smallest index in its
//! subtree so a lookup can skip branches that cannot beat the best match
//! found so far.

use crate::pattern::Segment;
use smallvec::SmallVec;

/// No rule.
const NONE: usize = usize::MAX;

/// A node in the segment trie.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Literal children, sorted by segment for binary search.
    statics: Vec<(String, Node)>,
    /// Prefixed-capture children, sorted by their literal prefix.
    prefixed: Vec<(String, Node)>,
    /// Length in bytes of the longest prefix in `prefixed`.
    max_prefix: usize,
    /// Shared child for captures and `_` wildcards.
    any: Option<Box<Node>>,
    /// Earliest rule ending exactly here.
    terminal: Option<usize>,
    /// Earliest rule with a glob starting here.
    glob: Option<usize>,
    /// Smallest rule index in this subtree.
    min_rule: usize,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            statics: Vec::new(),
            prefixed: Vec::new(),
            max_prefix: 0,
            any: None,
            terminal: None,
            glob: None,
            min_rule: NONE,
        }
    }
}

impl Node {
    /// Inserts `rule` under `segments`.
    ///
    /// Rules must be inserted in declaration order; a later rule with the
    /// same shape as an earlier one never replaces it.
    pub(crate) fn insert(&mut self, segments: &[Segment], rule: usize) {
        self.min_rule = self.min_rule.min(rule);

        let Some((segment, rest)) = segments.split_first() else {
            self.terminal.get_or_insert(rule);
            return;
        };

        match segment {
            Segment::Literal(lit) => {
                let idx = match self
                    .statics
                    .binary_search_by(|(s, _)| s.as_str().cmp(lit.as_str()))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        self.statics.insert(idx, (lit.clone(), Node::default()));
                        idx
                    }
                };
                self.statics[idx].1.insert(rest, rule);
            }
            Segment::Prefixed { prefix, .. } => {
                let idx = match self
                    .prefixed
                    .binary_search_by(|(p, _)| p.as_str().cmp(prefix.as_str()))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        self.prefixed.insert(idx, (prefix.clone(), Node::default()));
                        self.max_prefix = self.max_prefix.max(prefix.len());
                        idx
                    }
                };
                self.prefixed[idx].1.insert(rest, rule);
            }
            Segment::Capture(_) => {
                self.any.get_or_insert_with(Box::default).insert(rest, rule);
            }
            Segment::Glob(_) => {
                self.glob.get_or_insert(rule);
            }
        }
    }

    /// Finds the earliest declared rule matching `path`.
    #[cfg(test)]
    pub(crate) fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        let mut best = NONE;
        self.find_into(path, &mut best);
        (best != NONE).then_some(best)
    }

    /// Lowers `best` to the earliest rule under this node matching `path`.
    pub(crate) fn find_into<S: AsRef<str>>(&self, path: &[S], best: &mut usize) {
        if self.min_rule >= *best {
            return;
        }
        if let Some(glob) = self.glob {
            *best = (*best).min(glob);
        }

        let Some((head, rest)) = path.split_first() else {
            if let Some(terminal) = self.terminal {
                *best = (*best).min(terminal);
            }
            return;
        };
        let head = head.as_ref();

        let mut candidates: SmallVec<[&Node; 4]> = SmallVec::new();
        if let Ok(idx) = self
            .statics
            .binary_search_by(|(s, _)| s.as_str().cmp(head))
        {
            candidates.push(&self.statics[idx].1);
        }
        // One lookup per prefix length of `head`.
        for end in 1..=head.len().min(self.max_prefix) {
            if !head.is_char_boundary(end) {
                continue;
            }
            if let Ok(idx) = self
                .prefixed
                .binary_search_by(|(p, _)| p.as_str().cmp(&head[..end]))
            {
                candidates.push(&self.prefixed[idx].1);
            }
        }
        if let Some(any) = &self.any {
            candidates.push(any);
        }
        candidates.sort_unstable_by_key(|child| child.min_rule);

        for child in candidates {
            if child.min_rule >= *best {
                break;
            }
            child.find_into(rest, best);
        }
    }

    /// Returns true if no rule was inserted.
    pub(crate) fn is_empty(&self) -> bool {
        self.min_rule == NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn trie(patterns: &[&str]) -> Node {
        let mut root = Node::default();
        for (rule, source) in patterns.iter().enumerate() {
            let pattern = Pattern::parse(source).unwrap();
            root.insert(pattern.segments(), rule);
        }
        root
    }

    fn find(root: &Node, path: &str) -> Option<usize> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        root.find(&segments)
    }

    #[test]
    fn test_static_match() {
        let root = trie(&["/", "/users", "/users/list", "/posts"]);
        assert_eq!(find(&root, "/"), Some(0));
        assert_eq!(find(&root, "/users"), Some(1));
        assert_eq!(find(&root, "/users/list"), Some(2));
        assert_eq!(find(&root, "/posts"), Some(3));
        assert_eq!(find(&root, "/comments"), None);
    }

    #[test]
    fn test_static_children_stay_sorted() {
        let root = trie(&["/c", "/a", "/b"]);
        let keys: Vec<&str> = root.statics.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(find(&root, "/a"), Some(1));
    }

    #[test]
    fn test_earliest_declared_wins() {
        let root = trie(&["/a", "/:x"]);
        assert_eq!(find(&root, "/a"), Some(0));
        assert_eq!(find(&root, "/other"), Some(1));

        let root = trie(&["/:x", "/a"]);
        assert_eq!(find(&root, "/a"), Some(0));
    }

    #[test]
    fn test_capture_before_literal_deeper() {
        let root = trie(&["/users/:id/edit", "/users/new/edit", "/users/new"]);
        assert_eq!(find(&root, "/users/new/edit"), Some(0));
        assert_eq!(find(&root, "/users/new"), Some(2));
    }

    #[test]
    fn test_backtracking_to_capture() {
        let root = trie(&["/users/new", "/users/:id/posts"]);
        assert_eq!(find(&root, "/users/new/posts"), Some(1));
    }

    #[test]
    fn test_glob() {
        let root = trie(&["/files/*rest", "/files/special"]);
        assert_eq!(find(&root, "/files"), Some(0));
        assert_eq!(find(&root, "/files/a/b/c"), Some(0));
        assert_eq!(find(&root, "/files/special"), Some(0));

        let root = trie(&["/files/special", "/files/*rest"]);
        assert_eq!(find(&root, "/files/special"), Some(0));
        assert_eq!(find(&root, "/files/other"), Some(1));
    }

    #[test]
    fn test_prefixed_capture() {
        let root = trie(&["/user-:id", "/:other"]);
        assert_eq!(find(&root, "/user-7"), Some(0));
        assert_eq!(find(&root, "/team-7"), Some(1));
    }

    #[test]
    fn test_prefixed_edges_sorted() {
        let root = trie(&["/ab-:x", "/a-:y", "/a:z"]);
        let keys: Vec<&str> = root.prefixed.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(keys, ["a", "a-", "ab-"]);
        assert_eq!(root.max_prefix, 3);

        assert_eq!(find(&root, "/ab-1"), Some(0));
        assert_eq!(find(&root, "/a-1"), Some(1));
        assert_eq!(find(&root, "/ax"), Some(2));
        assert_eq!(find(&root, "/b"), None);
    }

    #[test]
    fn test_many_prefixed_edges() {
        let patterns: Vec<String> = (0..200).map(|i| format!("/p{i:03}-:id")).collect();
        let sources: Vec<&str> = patterns.iter().map(String::as_str).collect();
        let root = trie(&sources);

        assert_eq!(find(&root, "/p000-a"), Some(0));
        assert_eq!(find(&root, "/p137-a"), Some(137));
        assert_eq!(find(&root, "/p199-a"), Some(199));
        assert_eq!(find(&root, "/p200-a"), None);
    }

    #[test]
    fn test_prefixed_multibyte_head() {
        let root = trie(&["/é-:x"]);
        assert_eq!(find(&root, "/é-1"), Some(0));
        assert_eq!(find(&root, "/ée"), None);
    }

    #[test]
    fn test_same_shape_keeps_first() {
        let root = trie(&["/:a", "/:b"]);
        assert_eq!(find(&root, "/x"), Some(0));
    }

    #[test]
    fn test_empty() {
        assert!(Node::default().is_empty());
        assert!(!trie(&["/"]).is_empty());
        assert_eq!(find(&Node::default(), "/"), None);
    }
}

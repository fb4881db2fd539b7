//! Property tests: the trie agrees with a linear scan over the rules in
//! declaration order.

use http::Method;
use plumb_pipeline::Pipeline;
use plumb_router::{Pattern, Router};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Rule {
    method: Option<Method>,
    pattern: String,
}

fn segment(position: usize) -> impl Strategy<Value = String> {
    prop_oneof![
        Just("a".to_string()),
        Just("b".to_string()),
        Just(format!(":x{position}")),
        Just("_".to_string()),
        Just(format!("p-:y{position}")),
    ]
}

fn pattern() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec(0..5usize, 0..4),
        any::<bool>(),
    )
        .prop_flat_map(|(kinds, glob)| {
            let segments: Vec<_> = kinds
                .iter()
                .enumerate()
                .map(|(position, _)| segment(position))
                .collect();
            (segments, Just(glob))
        })
        .prop_map(|(segments, glob)| {
            let mut pattern = String::new();
            for s in segments {
                pattern.push('/');
                pattern.push_str(&s);
            }
            if glob {
                pattern.push_str("/*rest");
            }
            if pattern.is_empty() {
                pattern.push('/');
            }
            pattern
        })
}

fn method() -> impl Strategy<Value = Option<Method>> {
    prop_oneof![
        Just(Some(Method::GET)),
        Just(Some(Method::POST)),
        Just(Some(Method::HEAD)),
        Just(None),
    ]
}

fn rule() -> impl Strategy<Value = Rule> {
    (method(), pattern()).prop_map(|(method, pattern)| Rule { method, pattern })
}

fn request_path() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        prop_oneof![
            Just("a".to_string()),
            Just("b".to_string()),
            Just("c".to_string()),
            Just("p-1".to_string()),
        ],
        0..5,
    )
}

fn request_method() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::GET),
        Just(Method::POST),
        Just(Method::HEAD),
        Just(Method::PUT),
    ]
}

fn method_accepts(rule: &Option<Method>, request: &Method) -> bool {
    match rule {
        None => true,
        Some(m) => m == request || (*request == Method::HEAD && *m == Method::GET),
    }
}

fn linear_scan(rules: &[Rule], method: &Method, path: &[String]) -> Option<usize> {
    rules.iter().position(|rule| {
        method_accepts(&rule.method, method)
            && Pattern::parse(&rule.pattern).unwrap().matches(path)
    })
}

fn build(rules: &[Rule]) -> Router {
    let mut builder = Router::builder();
    for rule in rules {
        builder = match &rule.method {
            Some(m) => builder.route(m.clone(), &rule.pattern, Pipeline::empty()),
            None => builder.match_any(&rule.pattern, Pipeline::empty()),
        };
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn prop_trie_matches_linear_scan(
        rules in proptest::collection::vec(rule(), 1..12),
        method in request_method(),
        path in request_path(),
    ) {
        let router = build(&rules);
        let target = format!("/{}", path.join("/"));

        let expected = linear_scan(&rules, &method, &path);
        let actual = router.match_route(&method, &target).map(|m| m.index);
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_match_binds_every_named_capture(
        rules in proptest::collection::vec(rule(), 1..8),
        path in request_path(),
    ) {
        let router = build(&rules);
        let target = format!("/{}", path.join("/"));

        if let Some(m) = router.match_route(&Method::GET, &target) {
            let pattern = Pattern::parse(&rules[m.index].pattern).unwrap();
            let (params, consumed) = pattern.bind(&path);
            prop_assert_eq!(m.params, params);
            prop_assert_eq!(m.consumed, consumed);
            prop_assert!(consumed <= path.len());
        }
    }
}

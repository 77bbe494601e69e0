//! Property-based tests for the selector dialect.
//!
//! These tests use proptest to generate random selectors and verify that
//! invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::selector::{NodeTest, Predicate, Selector, Step, ACTIVITY_PLACEHOLDER};
    use proptest::prelude::*;

    fn name() -> impl Strategy<Value = String> {
        "[a-zA-Z_][a-zA-Z0-9_.-]{0,8}(:[a-zA-Z][a-zA-Z0-9]{0,6})?"
    }

    fn predicate() -> impl Strategy<Value = Predicate> {
        (name(), proptest::option::of("[a-zA-Z0-9._{} =-]{0,12}"))
            .prop_map(|(attribute, value)| Predicate { attribute, value })
    }

    fn step() -> impl Strategy<Value = Step> {
        let test = prop_oneof![
            1 => Just(NodeTest::Any),
            4 => name().prop_map(NodeTest::Named),
        ];
        (test, proptest::collection::vec(predicate(), 0..3))
            .prop_map(|(test, predicates)| Step { test, predicates })
    }

    fn selector() -> impl Strategy<Value = Selector> {
        (any::<bool>(), proptest::collection::vec(step(), 1..5))
            .prop_map(|(absolute, steps)| Selector { absolute, steps })
            .prop_filter("'/*' spells the root", |s| s.to_string() != "/*")
    }

    // ============================================================================
    // parse / display
    // ============================================================================

    proptest! {
        /// Property: the canonical form parses back to the same selector
        #[test]
        fn display_then_parse_is_identity(selector in selector()) {
            let text = selector.to_string();
            let parsed = Selector::parse(&text);
            prop_assert!(parsed.is_ok(), "'{}' did not parse: {:?}", text, parsed);
            prop_assert_eq!(parsed.unwrap(), selector);
        }

        /// Property: parse never panics, whatever the input
        #[test]
        fn parse_never_panics(input in ".*") {
            let _ = Selector::parse(&input);
        }

        /// Property: root spellings all parse to the root selector
        #[test]
        fn root_spellings_are_root(pad in "[ \t]{0,3}", spelling in prop_oneof![Just(""), Just("/*"), Just("*/"), Just("."), Just("./")]) {
            let input = format!("{}{}{}", pad, spelling, pad);
            let parsed = Selector::parse(&input).unwrap();
            prop_assert!(parsed.is_root());
        }
    }

    // ============================================================================
    // fallbacks
    // ============================================================================

    proptest! {
        /// Property: one_level_down prefixes exactly one wildcard step
        #[test]
        fn one_level_down_adds_wildcard(selector in selector()) {
            let down = selector.one_level_down();
            prop_assert_eq!(down.steps.len(), selector.steps.len() + 1);
            prop_assert_eq!(&down.steps[0].test, &NodeTest::Any);
            prop_assert_eq!(&down.steps[1..], &selector.steps[..]);
        }

        /// Property: substitution leaves no placeholder behind
        #[test]
        fn with_activity_removes_placeholder(selector in selector(), activity in "[A-Z][a-zA-Z]{0,10}") {
            let mut templated = selector.clone();
            templated.steps[0].predicates.push(Predicate {
                attribute: "android:name".to_string(),
                value: Some(ACTIVITY_PLACEHOLDER.to_string()),
            });
            prop_assert!(templated.has_placeholder());

            let substituted = templated.with_activity(&activity);
            prop_assert!(!substituted.has_placeholder());
            prop_assert_eq!(
                substituted.steps[0].predicates.last().and_then(|p| p.value.clone()),
                Some(activity)
            );
        }

        /// Property: split_last and the removed step rebuild the selector
        #[test]
        fn split_last_rebuilds(selector in selector()) {
            let (parent, last) = selector.split_last().unwrap();
            let mut rebuilt = parent;
            rebuilt.steps.push(last);
            prop_assert_eq!(rebuilt, selector);
        }
    }
}

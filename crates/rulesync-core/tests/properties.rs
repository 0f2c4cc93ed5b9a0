//! Codec and repair invariants
//!
//! Round-trip of well-formed entries, repair idempotence and uniqueness.

use proptest::prelude::*;
use rulesync_core::{build, parse, repair, Entry, Rule};
use std::collections::HashSet;

fn key_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_. -]{0,11}[A-Za-z0-9]"
}

fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[A-Za-z0-9][A-Za-z0-9 ,.!?:]{0,20}",
        "[A-Za-z0-9]{1,8}\n{1,3}[A-Za-z0-9 ]{0,8}[A-Za-z0-9]",
    ]
}

fn entries_strategy() -> impl Strategy<Value = Vec<Entry>> {
    proptest::collection::vec((key_strategy(), value_strategy()), 0..8)
        .prop_map(|pairs| pairs.into_iter().map(|(k, v)| Entry::new(k, v)).collect())
}

fn rules_strategy() -> impl Strategy<Value = Vec<Rule>> {
    proptest::collection::vec(
        (
            -2_i64..6,
            prop_oneof![
                Just("a".to_string()),
                Just("b".to_string()),
                Just("a_duplicate_1".to_string()),
                Just(String::new()),
                Just(" a ".to_string()),
                Just("b: c".to_string()),
                "[a-c]{1,2}",
            ],
        ),
        0..10,
    )
    .prop_map(|pairs| pairs.into_iter().map(|(id, key)| Rule::new(id, key)).collect())
}

fn readable(key: &str) -> &str {
    let key = key.trim();
    key.split(':').next().unwrap_or(key).trim_end()
}

proptest! {
    #[test]
    fn prop_parse_build_round_trip(entries in entries_strategy()) {
        let text = build(&entries);
        prop_assert_eq!(parse(&text).entries, entries);
    }

    #[test]
    fn prop_build_parse_is_stable(entries in entries_strategy()) {
        let text = build(&entries);
        prop_assert_eq!(build(&parse(&text).entries), text);
    }

    #[test]
    fn prop_repair_is_idempotent(rules in rules_strategy()) {
        let first = repair(&rules);
        let second = repair(&first.rules);
        prop_assert!(!second.changed);
        prop_assert_eq!(second.rules, first.rules);
    }

    #[test]
    fn prop_repair_output_is_unique(rules in rules_strategy()) {
        let repaired = repair(&rules);
        let ids: HashSet<i64> = repaired.rules.iter().map(|r| r.id).collect();
        let keys: HashSet<&str> = repaired.rules.iter().map(|r| r.key.as_str()).collect();
        prop_assert_eq!(ids.len(), repaired.rules.len());
        prop_assert_eq!(keys.len(), repaired.rules.len());
        prop_assert!(repaired.rules.iter().all(|r| r.id > 0 && !r.key.is_empty()));
    }

    #[test]
    fn prop_repair_preserves_order_of_kept_rules(rules in rules_strategy()) {
        let repaired = repair(&rules);
        let kept: Vec<&str> = rules
            .iter()
            .map(|r| readable(&r.key))
            .filter(|key| !key.is_empty())
            .collect();
        prop_assert_eq!(kept.len(), repaired.rules.len());
        for (before, after) in kept.iter().zip(&repaired.rules) {
            let renamed = repaired.renames.source_of(&after.key);
            prop_assert!(after.key == *before || renamed == Some(*before));
        }
    }

    #[test]
    fn prop_repaired_keys_read_back(rules in rules_strategy()) {
        let repaired = repair(&rules);
        let entries: Vec<Entry> = repaired
            .rules
            .iter()
            .map(|r| Entry::new(r.key.clone(), "v"))
            .collect();
        let parsed = parse(&build(&entries));
        let keys: Vec<&str> = repaired.rules.iter().map(|r| r.key.as_str()).collect();
        prop_assert_eq!(parsed.keys().collect::<Vec<_>>(), keys);
    }
}

#[test]
fn scenario_b_duplicate_ids() {
    let repaired = repair(&[Rule::new(1, "a"), Rule::new(1, "b")]);
    assert!(repaired.changed);
    assert_eq!(repaired.rules, vec![Rule::new(1, "a"), Rule::new(2, "b")]);
}

#[test]
fn scenario_c_duplicate_keys() {
    let repaired = repair(&[Rule::new(1, "x"), Rule::new(2, "x")]);
    assert_eq!(repaired.rules, vec![Rule::new(1, "x"), Rule::new(2, "x_duplicate_1")]);
    let renames: Vec<(&str, &str)> = repaired
        .renames
        .iter()
        .map(|r| (r.original.as_str(), r.to.as_str()))
        .collect();
    assert_eq!(renames, vec![("x", "x_duplicate_1")]);
}

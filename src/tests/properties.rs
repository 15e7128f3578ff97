use crate::config::GrammarConfig;
use crate::export::ExportedGrammar;
use crate::grammar::Grammar;
use crate::symbol::{RuleId, Symbol};
use proptest::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;

/// Checks digram uniqueness on a snapshot, independently of the engine's own
/// audit. Overlapping occurrences inside a run (`a a a`) are allowed.
fn duplicate_digram<T: Clone + Eq + Hash>(exported: &ExportedGrammar<T>) -> Option<RuleId> {
    let mut seen: HashMap<(Symbol<T>, Symbol<T>), (RuleId, usize)> = HashMap::new();

    for (&id, body) in exported.rules() {
        for (i, pair) in body.windows(2).enumerate() {
            let digram = (pair[0].clone(), pair[1].clone());
            match seen.get(&digram) {
                Some(&(rule, j)) if rule == id && j + 1 == i => {}
                Some(_) => return Some(id),
                None => {
                    seen.insert(digram, (id, i));
                }
            }
        }
    }

    None
}

/// Counts how often each rule is referenced across a snapshot.
fn usage_counts<T>(exported: &ExportedGrammar<T>) -> HashMap<RuleId, u32> {
    let mut counts = HashMap::new();
    for body in exported.rules().values() {
        for symbol in body {
            if let Some(id) = symbol.rule_id() {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn small_alphabet() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 0..300)
}

proptest! {
    /// Property 1: Roundtrip fidelity
    /// The reconstructed sequence must exactly match the input.
    #[test]
    fn prop_roundtrip(input: Vec<u8>) {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input.clone());

        let reconstructed: Vec<u8> = grammar.iter().copied().collect();
        prop_assert_eq!(&reconstructed, &input);

        let expanded = grammar.export().expand().unwrap();
        prop_assert_eq!(expanded, input);
    }

    /// Property 2: Length preservation
    #[test]
    fn prop_length_preserved(input in small_alphabet()) {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input.clone());

        prop_assert_eq!(grammar.iter().count(), input.len());
        prop_assert_eq!(grammar.len(), input.len());
    }

    /// Property 3: Both constraints hold after every single token
    #[test]
    fn prop_invariants_after_every_token(input in small_alphabet()) {
        let mut grammar = Grammar::new();

        for &token in &input {
            grammar.consume(token);
            prop_assert_eq!(grammar.verify(), Ok(()));
        }
    }

    /// Property 4: Digram uniqueness, checked on the exported snapshot
    #[test]
    fn prop_digram_uniqueness(input in small_alphabet()) {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input);

        let exported = grammar.export();
        prop_assert_eq!(duplicate_digram(&exported), None);
    }

    /// Property 5: Rule utility
    /// Every derived rule is used at least twice, and the recorded reference
    /// counts agree with the snapshot.
    #[test]
    fn prop_rule_utility(input in small_alphabet()) {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input);

        let exported = grammar.export();
        let counts = usage_counts(&exported);
        for &id in exported.rules().keys() {
            if id.is_start() {
                continue;
            }
            let used = counts.get(&id).copied().unwrap_or(0);
            prop_assert!(used >= 2, "Rule {} has count {}, expected >= 2", id, used);
            prop_assert_eq!(grammar.reference_count(id), Ok(used));
        }
    }

    /// Property 6: Non-empty rules
    #[test]
    fn prop_nonempty_rules(input in small_alphabet()) {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input);

        for (id, body) in grammar.export().rules() {
            if !id.is_start() {
                prop_assert!(body.len() >= 2, "Rule {} has {} symbols", id, body.len());
            }
        }
    }

    /// Property 7: Determinism
    /// Two fresh grammars fed the same tokens export the same snapshot.
    #[test]
    fn prop_deterministic(input in small_alphabet()) {
        let first: Grammar<u8> = input.iter().copied().collect();
        let mut second = Grammar::new();
        for &token in &input {
            second.consume(token);
        }

        prop_assert_eq!(first.export(), second.export());
    }

    /// Property 8: Export does not mutate
    #[test]
    fn prop_export_idempotent(input in small_alphabet()) {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input);

        let once = grammar.export();
        let twice = grammar.export();
        prop_assert_eq!(once, twice);
    }

    /// Property 9: Every exported rule is reachable and every reference
    /// resolves
    #[test]
    fn prop_export_closed(input in small_alphabet()) {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input);

        let exported = grammar.export();
        prop_assert_eq!(exported.rules().len(), grammar.rule_count());
        for id in usage_counts(&exported).keys() {
            prop_assert!(exported.get(*id).is_some());
        }
    }

    /// Property 10: Word tokens behave like bytes
    #[test]
    fn prop_word_tokens(words in prop::collection::vec(prop::sample::select(vec!["the", "cat", "sat", "on", "mat"]), 0..120)) {
        let mut grammar = Grammar::with_config(GrammarConfig::new().with_capacity(words.len()));
        grammar.consume_sequence(words.iter().map(|w| w.to_string()));

        let reconstructed: Vec<String> = grammar.iter().cloned().collect();
        let expected: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        prop_assert_eq!(reconstructed, expected);
        prop_assert_eq!(grammar.verify(), Ok(()));
    }
}

/// Bolero fuzz test: No panics on arbitrary input
#[test]
fn fuzz_no_panic() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(input.iter().copied());

        let _ = grammar.len();
        let _ = grammar.is_empty();
        let _ = grammar.stats();

        let reconstructed: Vec<u8> = grammar.iter().copied().collect();
        assert_eq!(reconstructed, *input);
    });
}

/// Bolero fuzz test: The audit passes on arbitrary input
#[test]
fn fuzz_invariants() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let mut grammar = Grammar::new();
        // Fold onto a small alphabet so repeats are common
        grammar.consume_sequence(input.iter().map(|b| b % 3));

        if let Err(err) = grammar.verify() {
            panic!("{err} for input {input:?}");
        }
    });
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn scenario(input: &str) -> (Grammar<char>, ExportedGrammar<char>) {
        let mut grammar =
            Grammar::with_config(GrammarConfig::new().with_verification(true));
        grammar.consume_sequence(input.chars());
        let exported = grammar.export();
        (grammar, exported)
    }

    fn only_derived(exported: &ExportedGrammar<char>) -> (RuleId, Vec<Symbol<char>>) {
        let derived: Vec<_> = exported
            .rules()
            .iter()
            .filter(|(id, _)| !id.is_start())
            .collect();
        assert_eq!(derived.len(), 1, "expected exactly one derived rule");
        (*derived[0].0, derived[0].1.clone())
    }

    fn terminals(s: &str) -> Vec<Symbol<char>> {
        s.chars().map(Symbol::terminal).collect()
    }

    #[test]
    fn test_scenario_a_no_repeats() {
        let (_, exported) = scenario("aabb");
        assert_eq!(exported.rules().len(), 1);
        assert_eq!(exported.start(), terminals("aabb").as_slice());
    }

    #[test]
    fn test_scenario_b_abab() {
        let (grammar, exported) = scenario("abab");
        let (r, body) = only_derived(&exported);
        assert_eq!(body, terminals("ab"));
        assert_eq!(grammar.reference_count(r), Ok(2));
        assert_eq!(
            exported.start(),
            &[Symbol::nonterminal(r), Symbol::nonterminal(r)]
        );
    }

    #[test]
    fn test_scenario_c_abcabc() {
        let (_, exported) = scenario("abcabc");
        let (r, body) = only_derived(&exported);
        assert_eq!(body, terminals("abc"));
        assert_eq!(
            exported.start(),
            &[Symbol::nonterminal(r), Symbol::nonterminal(r)]
        );
    }

    #[test]
    fn test_scenario_d_aaaa() {
        let (grammar, exported) = scenario("aaaa");
        let (r, body) = only_derived(&exported);
        assert_eq!(body, terminals("aa"));
        assert_eq!(grammar.reference_count(r), Ok(2));
        assert_eq!(
            exported.start(),
            &[Symbol::nonterminal(r), Symbol::nonterminal(r)]
        );
    }

    #[test]
    fn test_scenario_e_dissolution_before_cascade() {
        let mut grammar = Grammar::with_config(GrammarConfig::new().with_verification(true));
        grammar.consume_sequence("abcab".chars());

        let before = grammar.export();
        let (inner, _) = only_derived(&before);
        assert_eq!(grammar.reference_count(inner), Ok(2));

        // The new rule `<ab> c` takes both uses of `<ab>` but holds it only
        // once, so `<ab>` is dissolved into it.
        grammar.consume('c');
        let after = grammar.export();
        let (outer, body) = only_derived(&after);
        assert_ne!(outer, inner);
        assert!(after.get(inner).is_none());
        assert_eq!(
            grammar.reference_count(inner),
            Err(crate::error::GrammarError::RuleNotFound(inner))
        );
        assert_eq!(body, terminals("abc"));
        assert_eq!(grammar.iter().collect::<String>(), "abcabc");
    }

    #[test]
    fn test_all_rules_used_twice() {
        let (_, exported) = scenario("abracadabra");
        let counts = usage_counts(&exported);
        for &id in exported.rules().keys() {
            if !id.is_start() {
                assert!(counts[&id] >= 2, "Rule {id} only used {} times", counts[&id]);
            }
        }
    }

    #[test]
    fn test_long_run() {
        let input = "a".repeat(1000);
        let (grammar, exported) = scenario(&input);
        assert_eq!(grammar.iter().collect::<String>(), input);
        assert_eq!(duplicate_digram(&exported), None);
        // Runs compress logarithmically
        assert!(grammar.stats().grammar_symbols < 100);
    }

    #[test]
    fn test_sentence_tokens() {
        let text = "i like to watch the birds fly by in the fall i like to watch the leaves fall";
        let mut grammar = Grammar::with_config(GrammarConfig::new().with_verification(true));
        grammar.consume_sequence(text.split(' '));

        let words: Vec<&str> = grammar.iter().copied().collect();
        assert_eq!(words.join(" "), text);
        assert!(grammar.rule_count() > 1);
    }
}

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::symbol::{Node, NodeKey, RuleId, Symbol};
use slotmap::SlotMap;
use std::collections::{BTreeMap, VecDeque};
use std::hash::Hash;

/// Lazy traversal of one rule's right-hand side, guard excluded.
///
/// A clone is an independent cursor at the same position, so a saved clone
/// of a fresh iterator can replay the whole body.
pub struct RightHandSide<'a, T> {
    nodes: &'a SlotMap<NodeKey, Node<T>>,
    guard: NodeKey,
    current: NodeKey,
}

impl<T> Clone for RightHandSide<'_, T> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            guard: self.guard,
            current: self.current,
        }
    }
}

impl<'a, T> Iterator for RightHandSide<'a, T> {
    type Item = &'a Symbol<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.guard {
            return None;
        }
        let node = &self.nodes[self.current];
        self.current = node.next;
        node.symbol()
    }
}

/// Snapshot of a grammar: every rule reachable from the start rule, mapped to
/// its right-hand side.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportedGrammar<T> {
    rules: BTreeMap<RuleId, Vec<Symbol<T>>>,
}

impl<T> ExportedGrammar<T> {
    pub fn rules(&self) -> &BTreeMap<RuleId, Vec<Symbol<T>>> {
        &self.rules
    }

    pub fn into_rules(self) -> BTreeMap<RuleId, Vec<Symbol<T>>> {
        self.rules
    }

    pub fn get(&self, id: RuleId) -> Option<&[Symbol<T>]> {
        self.rules.get(&id).map(Vec::as_slice)
    }

    pub fn start(&self) -> &[Symbol<T>] {
        self.get(RuleId::START).unwrap_or(&[])
    }

    /// Returns the rule bodies as `(token, is_terminal)` pairs, nonterminals
    /// rendered through `name`.
    pub fn flatten<F>(&self, mut name: F) -> BTreeMap<RuleId, Vec<(T, bool)>>
    where
        T: Clone,
        F: FnMut(RuleId) -> T,
    {
        self.rules
            .iter()
            .map(|(&id, body)| {
                let pairs = body
                    .iter()
                    .map(|symbol| match symbol {
                        Symbol::Terminal(token) => (token.clone(), true),
                        Symbol::Nonterminal(rule) => (name(*rule), false),
                    })
                    .collect();
                (id, pairs)
            })
            .collect()
    }
}

impl<T: Clone> ExportedGrammar<T> {
    /// Fully expands the start rule back into the token sequence.
    ///
    /// Snapshots can come from outside the engine, so dangling and cyclic
    /// references are reported instead of trusted.
    pub fn expand(&self) -> Result<Vec<T>, GrammarError> {
        let mut out = Vec::new();
        let start = self
            .rules
            .get(&RuleId::START)
            .ok_or(GrammarError::RuleNotFound(RuleId::START))?;

        let mut stack: Vec<(RuleId, std::slice::Iter<'_, Symbol<T>>)> =
            vec![(RuleId::START, start.iter())];

        while let Some((_, body)) = stack.last_mut() {
            match body.next() {
                None => {
                    stack.pop();
                }
                Some(Symbol::Terminal(token)) => out.push(token.clone()),
                Some(Symbol::Nonterminal(id)) => {
                    let id = *id;
                    if stack.iter().any(|(open, _)| *open == id) {
                        return Err(GrammarError::CyclicRule(id));
                    }
                    let body = self.rules.get(&id).ok_or(GrammarError::RuleNotFound(id))?;
                    stack.push((id, body.iter()));
                }
            }
        }

        Ok(out)
    }
}

impl<T: Hash + Eq + Clone> Grammar<T> {
    /// Returns a lazy view of `id`'s right-hand side.
    pub fn right_hand_side(&self, id: RuleId) -> Result<RightHandSide<'_, T>, GrammarError> {
        let rule = self.rules.get(&id).ok_or(GrammarError::RuleNotFound(id))?;
        Ok(RightHandSide {
            nodes: &self.nodes,
            guard: rule.guard,
            current: self.nodes[rule.guard].next,
        })
    }

    /// Takes a snapshot of every rule reachable from the start rule.
    pub fn export(&self) -> ExportedGrammar<T> {
        let mut rules = BTreeMap::new();
        let mut pending = VecDeque::from([RuleId::START]);

        while let Some(id) = pending.pop_front() {
            if rules.contains_key(&id) {
                continue;
            }
            let body: Vec<Symbol<T>> = self.body(id).cloned().collect();
            for symbol in &body {
                if let Symbol::Nonterminal(child) = symbol {
                    if !rules.contains_key(child) {
                        pending.push_back(*child);
                    }
                }
            }
            rules.insert(id, body);
        }

        ExportedGrammar { rules }
    }

    fn body(&self, id: RuleId) -> RightHandSide<'_, T> {
        let guard = self.rule(id).guard;
        RightHandSide {
            nodes: &self.nodes,
            guard,
            current: self.nodes[guard].next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_hand_side_is_restartable() {
        let mut grammar = Grammar::new();
        grammar.consume_sequence("xyz".chars());

        let rhs = grammar.right_hand_side(RuleId::START).unwrap();
        let first: Vec<_> = rhs.clone().collect();
        let second: Vec<_> = rhs.collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                &Symbol::terminal('x'),
                &Symbol::terminal('y'),
                &Symbol::terminal('z')
            ]
        );
    }

    #[test]
    fn test_right_hand_side_missing_rule() {
        let grammar = Grammar::<char>::new();
        assert!(matches!(
            grammar.right_hand_side(RuleId(4)),
            Err(GrammarError::RuleNotFound(RuleId(4)))
        ));
    }

    #[test]
    fn test_export_empty() {
        let grammar = Grammar::<char>::new();
        let exported = grammar.export();
        assert_eq!(exported.rules().len(), 1);
        assert!(exported.start().is_empty());
        assert_eq!(exported.expand(), Ok(vec![]));
    }

    #[test]
    fn test_export_contains_reachable_rules_only() {
        let mut grammar = Grammar::new();
        grammar.consume_sequence("abcabcxyxy".chars());

        let exported = grammar.export();
        assert_eq!(exported.rules().len(), grammar.rule_count());
        for body in exported.rules().values() {
            for symbol in body {
                if let Some(id) = symbol.rule_id() {
                    assert!(exported.get(id).is_some());
                }
            }
        }
        assert_eq!(
            exported.expand().unwrap().into_iter().collect::<String>(),
            "abcabcxyxy"
        );
    }

    #[test]
    fn test_export_is_idempotent() {
        let mut grammar = Grammar::new();
        grammar.consume_sequence("mississippi".chars());
        assert_eq!(grammar.export(), grammar.export());
    }

    #[test]
    fn test_flatten_pairs() {
        let mut grammar = Grammar::new();
        grammar.consume_sequence(["to", "be", "to", "be"]);

        let flat = grammar.export().flatten(|_| "R");
        assert_eq!(flat[&RuleId::START], vec![("R", false), ("R", false)]);
        let derived: Vec<_> = flat
            .iter()
            .filter(|(id, _)| !id.is_start())
            .map(|(_, body)| body.clone())
            .collect();
        assert_eq!(derived, vec![vec![("to", true), ("be", true)]]);
    }

    #[test]
    fn test_expand_rejects_malformed_snapshots() {
        let mut rules = BTreeMap::new();
        rules.insert(RuleId::START, vec![Symbol::<char>::nonterminal(RuleId(1))]);
        let dangling = ExportedGrammar {
            rules: rules.clone(),
        };
        assert_eq!(dangling.expand(), Err(GrammarError::RuleNotFound(RuleId(1))));

        rules.insert(RuleId(1), vec![Symbol::nonterminal(RuleId(1))]);
        let cyclic = ExportedGrammar { rules };
        assert_eq!(cyclic.expand(), Err(GrammarError::CyclicRule(RuleId(1))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_snapshot() {
        let mut grammar = Grammar::new();
        grammar.consume_sequence("abab".chars());
        let exported = grammar.export();

        let json = serde_json::to_string(&exported).unwrap();
        let restored: ExportedGrammar<char> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, exported);
    }
}

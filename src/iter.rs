use crate::grammar::Grammar;
use crate::symbol::{NodeKey, RuleId, Slot, Symbol};
use std::hash::Hash;

/// Iterator that reconstructs the consumed sequence by expanding rules.
///
/// Keeps a stack of the nonterminal nodes it has descended through.
pub struct GrammarIter<'a, T> {
    grammar: &'a Grammar<T>,
    current: NodeKey,
    stack: Vec<NodeKey>,
}

impl<'a, T: Hash + Eq + Clone> GrammarIter<'a, T> {
    pub(crate) fn new(grammar: &'a Grammar<T>) -> Self {
        let guard = grammar.rule(RuleId::START).guard;
        Self {
            grammar,
            current: grammar.nodes[guard].next,
            stack: Vec::new(),
        }
    }
}

impl<'a, T: Hash + Eq + Clone> Iterator for GrammarIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let grammar: &'a Grammar<T> = self.grammar;
        let nodes = &grammar.nodes;
        loop {
            let node = &nodes[self.current];
            match &node.slot {
                Slot::Symbol(Symbol::Terminal(token)) => {
                    self.current = node.next;
                    return Some(token);
                }
                Slot::Symbol(Symbol::Nonterminal(id)) => {
                    // Descend into the rule
                    self.stack.push(self.current);
                    let guard = grammar.rule(*id).guard;
                    self.current = nodes[guard].next;
                }
                Slot::Guard(_) => {
                    // End of a rule body: resume after the parent, or stop at
                    // the start rule's guard
                    let parent = self.stack.pop()?;
                    self.current = nodes[parent].next;
                }
            }
        }
    }
}

impl<T: Hash + Eq + Clone> Grammar<T> {
    /// Returns an iterator over the reconstructed sequence.
    pub fn iter(&self) -> GrammarIter<'_, T> {
        GrammarIter::new(self)
    }
}

impl<'a, T: Hash + Eq + Clone> IntoIterator for &'a Grammar<T> {
    type Item = &'a T;
    type IntoIter = GrammarIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

use crate::error::{violated, InvariantViolation};
use crate::grammar::Grammar;
use crate::symbol::{Node, NodeKey, RuleId, Slot, Symbol};
use log::trace;
use std::hash::Hash;

/// A rule: a right-hand side ring closed by a guard node, plus the number of
/// nonterminals in the grammar that refer to it.
#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub id: RuleId,
    pub guard: NodeKey,
    pub count: u32,
}

impl Rule {
    #[inline]
    pub(crate) fn increment_reference(&mut self) {
        self.count += 1;
    }

    /// Returns the count after decrementing.
    #[inline]
    pub(crate) fn decrement_reference(&mut self) -> u32 {
        if self.count == 0 {
            violated(InvariantViolation::ReferenceUnderflow(self.id));
        }
        self.count -= 1;
        self.count
    }
}

impl<T: Hash + Eq + Clone> Grammar<T> {
    /// Allocates a rule with a guard-only body and a count of zero.
    pub(crate) fn create_empty(&mut self) -> RuleId {
        let id = self.id_gen.get();
        let guard = self.nodes.insert_with_key(|key| Node {
            slot: Slot::Guard(id),
            prev: key,
            next: key,
        });
        self.rules.insert(
            id,
            Rule {
                id,
                guard,
                count: 0,
            },
        );
        id
    }

    /// Appends `symbol` at the end of `rule`'s body.
    pub(crate) fn append(&mut self, rule: RuleId, symbol: Symbol<T>) -> NodeKey {
        let guard = self.rule(rule).guard;
        let last = self.nodes[guard].prev;
        self.insert_after(last, symbol)
    }

    /// Returns the rule whose entire body is the digram starting at `first`.
    ///
    /// The start rule never qualifies.
    pub(crate) fn complete_rule_at(&self, first: NodeKey) -> Option<RuleId> {
        let before = self.nodes[first].prev;
        let id = self.nodes[before].guard_of()?;
        if id.is_start() {
            return None;
        }

        let second = self.nodes[first].next;
        let after = self.nodes[second].next;
        match self.nodes[after].guard_of() {
            Some(closing) if closing == id => Some(id),
            _ => None,
        }
    }

    /// Replaces the digram starting at `first` with a nonterminal for `rule`
    /// and repairs the two new boundaries.
    pub(crate) fn substitute(&mut self, first: NodeKey, rule: RuleId) {
        let before = self.nodes[first].prev;
        let second = self.nodes[first].next;

        self.remove_node(first);
        self.remove_node(second);
        let inserted = self.insert_after(before, Symbol::Nonterminal(rule));

        self.check(before);
        if self.nodes.contains_key(inserted) {
            self.check(inserted);
        }
    }

    /// Resolves a repeated digram: `local` is the new occurrence, `found` the
    /// one held by the index.
    pub(crate) fn resolve(&mut self, local: NodeKey, found: NodeKey) {
        let rule = match self.complete_rule_at(found) {
            Some(rule) => {
                trace!("Reusing rule {rule}");
                self.substitute(local, rule);
                rule
            }
            None => {
                let first = self.symbol_at(found).clone();
                let second = self.symbol_at(self.nodes[found].next).clone();

                let rule = self.create_empty();
                let body_first = self.append(rule, first);
                self.append(rule, second);
                trace!("Created rule {rule}");

                self.substitute(found, rule);
                self.substitute(local, rule);

                // Both raw occurrences are gone, so the body now holds the
                // only copy of the digram. A cascade may have moved the body
                // into another rule, hence the node rather than the rule.
                if self.nodes.contains_key(body_first) {
                    if let Some(digram) = self.digram_at(body_first) {
                        if self.digrams.lookup(&digram).is_none() {
                            self.digrams.record(digram, body_first);
                        }
                    }
                }
                rule
            }
        };

        self.enforce_utility(rule);
    }

    /// Dissolves every rule referenced from `rule`'s body that is used only
    /// once.
    fn enforce_utility(&mut self, rule: RuleId) {
        let Some(guard) = self.rules.get(&rule).map(|r| r.guard) else {
            return;
        };

        let first = self.nodes[guard].next;
        let second = self.nodes[first].next;

        self.dissolve_if_unused(first);
        if self.nodes.contains_key(second) {
            self.dissolve_if_unused(second);
        }
    }

    /// Inlines the rule referenced by `node` if this is its only use.
    pub(crate) fn dissolve_if_unused(&mut self, node: NodeKey) {
        let Some(Symbol::Nonterminal(id)) = self.nodes[node].symbol() else {
            return;
        };
        let id = *id;

        if self.rule(id).count == 1 {
            self.dissolve(node, id);
        }
    }

    /// Splices the body of rule `id` in place of its last nonterminal `node`
    /// and removes the rule.
    fn dissolve(&mut self, node: NodeKey, id: RuleId) {
        if id.is_start() {
            violated(InvariantViolation::StartRuleDissolution);
        }

        let left = self.nodes[node].prev;
        let right = self.nodes[node].next;

        // Every digram containing this nonterminal sits next to `node`.
        if let Some(digram) = self.digram_at(left) {
            self.digrams.remove(&digram);
        }
        if let Some(digram) = self.digram_at(node) {
            self.digrams.remove(&digram);
        }

        let Some(rule) = self.rules.remove(&id) else {
            violated(InvariantViolation::MissingRule(id));
        };
        self.id_gen.free(id);

        let first = self.nodes[rule.guard].next;
        let last = self.nodes[rule.guard].prev;

        self.nodes[left].next = first;
        self.nodes[first].prev = left;
        self.nodes[last].next = right;
        self.nodes[right].prev = last;

        self.nodes.remove(rule.guard);
        self.nodes.remove(node);
        trace!("Dissolved rule {id}");

        self.check(left);
        if self.nodes.contains_key(last) {
            self.check(last);
        }
    }

    /// Inserts a new node for `symbol` after `at`, counting a use if it is a
    /// nonterminal.
    pub(crate) fn insert_after(&mut self, at: NodeKey, symbol: Symbol<T>) -> NodeKey {
        if let Symbol::Nonterminal(id) = symbol {
            self.rule_mut(id).increment_reference();
        }

        let inserted = self.nodes.insert(Node::detached(Slot::Symbol(symbol)));
        let next = self.nodes[at].next;
        self.join(inserted, next);
        self.join(at, inserted);
        inserted
    }

    /// Unlinks and frees `key`, forgetting its digrams and releasing its rule
    /// reference.
    pub(crate) fn remove_node(&mut self, key: NodeKey) {
        let prev = self.nodes[key].prev;
        let next = self.nodes[key].next;

        self.join(prev, next);
        self.forget_digram(key);

        let node = self.nodes.remove(key).expect("removed node must be live");
        if let Slot::Symbol(Symbol::Nonterminal(id)) = node.slot {
            self.rule_mut(id).decrement_reference();
        }
    }

    /// Links `left -> right`, forgetting the digram `left` previously started.
    ///
    /// When the old link was part of a run of three equal symbols, the
    /// overlapping digram that was never indexed is indexed now.
    fn join(&mut self, left: NodeKey, right: NodeKey) {
        let old_next = self.nodes[left].next;
        if self.nodes.contains_key(old_next) {
            self.forget_digram(left);

            let right_prev = self.nodes[right].prev;
            let right_next = self.nodes[right].next;
            if self.same_symbol(right, right_prev) && self.same_symbol(right, right_next) {
                self.record_digram(right);
            }

            let left_prev = self.nodes[left].prev;
            if self.same_symbol(left, old_next) && self.same_symbol(left, left_prev) {
                self.record_digram(left_prev);
            }
        }

        self.nodes[left].next = right;
        self.nodes[right].prev = left;
    }

    fn same_symbol(&self, a: NodeKey, b: NodeKey) -> bool {
        match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(a), Some(b)) => match (a.symbol(), b.symbol()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
            _ => false,
        }
    }

    fn symbol_at(&self, key: NodeKey) -> &Symbol<T> {
        self.nodes[key]
            .symbol()
            .expect("digram member is never a guard")
    }

    pub(crate) fn rule(&self, id: RuleId) -> &Rule {
        match self.rules.get(&id) {
            Some(rule) => rule,
            None => violated(InvariantViolation::MissingRule(id)),
        }
    }

    fn rule_mut(&mut self, id: RuleId) -> &mut Rule {
        match self.rules.get_mut(&id) {
            Some(rule) => rule,
            None => violated(InvariantViolation::MissingRule(id)),
        }
    }
}

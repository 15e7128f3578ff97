use crate::error::{violated, InvariantViolation};
use crate::grammar::Grammar;
use crate::symbol::{NodeKey, Symbol};
use ahash::AHashMap as HashMap;
use std::hash::Hash;

/// Signature of a digram: the two adjacent symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Digram<T>(pub Symbol<T>, pub Symbol<T>);

/// Maps each digram signature to the left node of the one occurrence the
/// grammar currently tracks.
///
/// The index knows nothing about guards; the grammar filters guard-adjacent
/// pairs before calling it.
#[derive(Debug)]
pub(crate) struct DigramIndex<T> {
    entries: HashMap<Digram<T>, NodeKey>,
}

impl<T: Hash + Eq> DigramIndex<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Unconditionally overwrites the entry for `digram`.
    #[inline]
    pub(crate) fn record(&mut self, digram: Digram<T>, node: NodeKey) {
        self.entries.insert(digram, node);
    }

    #[inline]
    pub(crate) fn lookup(&self, digram: &Digram<T>) -> Option<NodeKey> {
        self.entries.get(digram).copied()
    }

    /// Removes the entry for `digram`. Absent entries are ignored.
    pub(crate) fn remove(&mut self, digram: &Digram<T>) {
        self.entries.remove(digram);
    }

    /// Removes the entry only if it points at `node`.
    #[inline]
    pub(crate) fn remove_if_at(&mut self, digram: &Digram<T>, node: NodeKey) {
        if self.entries.get(digram) == Some(&node) {
            self.entries.remove(digram);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Digram<T>, NodeKey)> {
        self.entries.iter().map(|(digram, &node)| (digram, node))
    }
}

impl<T: Hash + Eq + Clone> Grammar<T> {
    /// Returns the digram starting at `first`, or `None` if either side is a
    /// guard.
    #[inline]
    pub(crate) fn digram_at(&self, first: NodeKey) -> Option<Digram<T>> {
        let node = &self.nodes[first];
        let left = node.symbol()?;
        let right = self.nodes[node.next].symbol()?;
        Some(Digram(left.clone(), right.clone()))
    }

    /// Records the digram starting at `first`, overwriting any entry.
    #[inline]
    pub(crate) fn record_digram(&mut self, first: NodeKey) {
        if let Some(digram) = self.digram_at(first) {
            self.digrams.record(digram, first);
        }
    }

    /// Drops the digram starting at `first` from the index if it is the
    /// indexed occurrence.
    #[inline]
    pub(crate) fn forget_digram(&mut self, first: NodeKey) {
        if let Some(digram) = self.digram_at(first) {
            self.digrams.remove_if_at(&digram, first);
        }
    }

    /// Classifies the digram starting at `first` against the index.
    ///
    /// Unseen digrams are recorded. A repeat elsewhere in the grammar is
    /// resolved by substitution, which may cascade. Returns `true` when the
    /// digram was replaced.
    pub(crate) fn check(&mut self, first: NodeKey) -> bool {
        let Some(digram) = self.digram_at(first) else {
            return false;
        };

        let Some(found) = self.digrams.lookup(&digram) else {
            self.digrams.record(digram, first);
            return false;
        };

        if found == first {
            return false;
        }

        if !self.nodes.contains_key(found) || self.digram_at(found).as_ref() != Some(&digram) {
            violated(InvariantViolation::StaleDigram);
        }

        // Runs such as `aaa` contain two overlapping occurrences of the same
        // digram; only one of them is ever indexed.
        let second = self.nodes[first].next;
        if self.nodes[found].next == first || found == second {
            return false;
        }

        self.resolve(first, found);
        true
    }
}

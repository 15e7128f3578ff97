use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Generational handle to a node in the grammar's arena.
    pub struct NodeKey;
}

/// Identifier of a rule. The start rule is always `RuleId(0)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    /// The start rule of every grammar.
    pub const START: RuleId = RuleId(0);

    /// Returns the raw numeric identifier.
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_start(self) -> bool {
        self == Self::START
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_start() {
            write!(f, "S")
        } else {
            write!(f, "R{}", self.0)
        }
    }
}

/// A symbol of the grammar: either an input token or a reference to a rule.
///
/// Equality compares the kind and the payload; two nonterminals are equal
/// exactly when they name the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbol<T> {
    /// An atomic input token.
    Terminal(T),

    /// A reference to a rule's right-hand side.
    Nonterminal(RuleId),
}

impl<T> Symbol<T> {
    pub fn terminal(token: T) -> Self {
        Symbol::Terminal(token)
    }

    pub fn nonterminal(rule: RuleId) -> Self {
        Symbol::Nonterminal(rule)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    /// Returns the token if this is a terminal.
    pub fn as_terminal(&self) -> Option<&T> {
        match self {
            Symbol::Terminal(token) => Some(token),
            Symbol::Nonterminal(_) => None,
        }
    }

    /// Returns the referenced rule if this is a nonterminal.
    pub fn rule_id(&self) -> Option<RuleId> {
        match self {
            Symbol::Terminal(_) => None,
            Symbol::Nonterminal(id) => Some(*id),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Symbol<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(token) => write!(f, "{token}"),
            Symbol::Nonterminal(id) => write!(f, "<{id}>"),
        }
    }
}

/// Content of an arena slot.
///
/// Every rule owns exactly one `Guard` node that closes its body into a ring.
/// The guard is never part of a digram.
#[derive(Debug, Clone)]
pub(crate) enum Slot<T> {
    Guard(RuleId),
    Symbol(Symbol<T>),
}

/// A node in the circular doubly-linked list of a rule body.
///
/// `prev`/`next` are null only while a freshly inserted node is being linked.
#[derive(Debug)]
pub(crate) struct Node<T> {
    pub slot: Slot<T>,
    pub prev: NodeKey,
    pub next: NodeKey,
}

impl<T> Node<T> {
    pub(crate) fn detached(slot: Slot<T>) -> Self {
        Self {
            slot,
            prev: NodeKey::default(),
            next: NodeKey::default(),
        }
    }

    #[inline]
    pub(crate) fn symbol(&self) -> Option<&Symbol<T>> {
        match &self.slot {
            Slot::Symbol(symbol) => Some(symbol),
            Slot::Guard(_) => None,
        }
    }

    #[inline]
    pub(crate) fn guard_of(&self) -> Option<RuleId> {
        match self.slot {
            Slot::Guard(id) => Some(id),
            Slot::Symbol(_) => None,
        }
    }
}

//! # Sequitur grammar induction
//!
//! Incremental inference of a hierarchical context-free grammar from a token
//! stream, by digram substitution.
//!
//! The grammar has one start rule and any number of derived rules. Expanding
//! the start rule reproduces the input exactly. Two constraints hold after
//! every consumed token:
//! 1. **Digram Uniqueness**: no pair of adjacent symbols appears more than once
//! 2. **Rule Utility**: every derived rule is used at least twice
//!
//! ## Example
//!
//! ```
//! use sequitur_grammar::{Grammar, Symbol};
//!
//! let mut grammar = Grammar::new();
//! grammar.consume_sequence("abcabc".chars());
//!
//! let exported = grammar.export();
//! assert_eq!(exported.rules().len(), 2);
//!
//! let rule = exported.start()[0].rule_id().unwrap();
//! assert_eq!(
//!     exported.get(rule).unwrap(),
//!     &[Symbol::terminal('a'), Symbol::terminal('b'), Symbol::terminal('c')]
//! );
//!
//! let reconstructed: String = grammar.iter().collect();
//! assert_eq!(reconstructed, "abcabc");
//! ```
//!
//! ## Performance
//!
//! - O(1) amortized time per token
//! - Nodes live in a generational arena (SlotMap), so removed nodes can never
//!   be reached through a stale handle

mod config;
mod digram;
mod error;
mod export;
mod grammar;
mod id_gen;
mod iter;
mod rule;
mod symbol;

#[cfg(test)]
mod tests;

pub use config::GrammarConfig;
pub use error::{GrammarError, InvariantViolation};
pub use export::{ExportedGrammar, RightHandSide};
pub use grammar::{Grammar, GrammarStats};
pub use iter::GrammarIter;
pub use symbol::{RuleId, Symbol};

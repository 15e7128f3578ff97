use crate::config::GrammarConfig;
use crate::digram::{Digram, DigramIndex};
use crate::error::{GrammarError, InvariantViolation};
use crate::id_gen::IdGenerator;
use crate::rule::Rule;
use crate::symbol::{Node, NodeKey, RuleId, Symbol};
use ahash::AHashMap as HashMap;
use log::{debug, error};
use slotmap::SlotMap;
use std::hash::Hash;

/// Incrementally built context-free grammar for a sequence of tokens.
///
/// Maintains two constraints after every consumed token:
/// 1. Digram Uniqueness: no pair of adjacent symbols occurs twice
/// 2. Rule Utility: every derived rule is referenced at least twice
///
/// ```
/// use sequitur_grammar::Grammar;
///
/// let mut grammar = Grammar::new();
/// grammar.consume_sequence("abab".chars());
///
/// let exported = grammar.export();
/// let start = &exported.rules()[&grammar.start_rule()];
/// assert_eq!(start.len(), 2);
/// assert!(start.iter().all(|symbol| !symbol.is_terminal()));
/// assert_eq!(grammar.iter().collect::<String>(), "abab");
/// ```
pub struct Grammar<T> {
    /// Arena holding every node of every rule, guards included
    pub(crate) nodes: SlotMap<NodeKey, Node<T>>,

    /// Live rules, start rule included
    pub(crate) rules: HashMap<RuleId, Rule>,

    pub(crate) digrams: DigramIndex<T>,

    pub(crate) id_gen: IdGenerator,

    config: GrammarConfig,

    /// Number of tokens consumed
    length: usize,
}

impl<T: Hash + Eq + Clone> Grammar<T> {
    /// Creates an empty grammar holding only the start rule.
    pub fn new() -> Self {
        Self::with_config(GrammarConfig::default())
    }

    pub fn with_config(config: GrammarConfig) -> Self {
        let mut grammar = Self {
            nodes: SlotMap::with_capacity_and_key(config.capacity + 1),
            rules: HashMap::default(),
            digrams: DigramIndex::with_capacity(config.capacity),
            id_gen: IdGenerator::new(),
            config,
            length: 0,
        };

        let start = grammar.create_empty();
        assert_eq!(start, RuleId::START, "First rule should be the start rule");
        grammar
    }

    /// Appends a token to the start rule and restores both constraints.
    pub fn consume(&mut self, token: T) {
        let guard = self.rule(RuleId::START).guard;
        let last = self.nodes[guard].prev;

        self.insert_after(last, Symbol::Terminal(token));
        self.length += 1;

        // `last` is the guard for the very first token
        self.check(last);

        if self.config.verify_invariants {
            if let Err(err) = self.verify() {
                error!("{err}");
                panic!("{err}");
            }
        }
    }

    /// Consumes every token of `tokens` in order.
    pub fn consume_sequence<I: IntoIterator<Item = T>>(&mut self, tokens: I) {
        let before = self.length;
        for token in tokens {
            self.consume(token);
        }
        debug!(
            "Consumed {} tokens: {} rules, {} grammar symbols",
            self.length - before,
            self.rules.len(),
            self.grammar_symbols()
        );
    }

    /// Returns the number of tokens consumed.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of live rules, start rule included.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn start_rule(&self) -> RuleId {
        RuleId::START
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Returns how many nonterminals refer to `id`. Always 0 for the start
    /// rule.
    pub fn reference_count(&self, id: RuleId) -> Result<u32, GrammarError> {
        self.rules
            .get(&id)
            .map(|rule| rule.count)
            .ok_or(GrammarError::RuleNotFound(id))
    }

    fn grammar_symbols(&self) -> usize {
        // Every rule owns exactly one guard node
        self.nodes.len() - self.rules.len()
    }

    /// Returns compression statistics.
    pub fn stats(&self) -> GrammarStats {
        GrammarStats {
            input_length: self.length,
            grammar_symbols: self.grammar_symbols(),
            num_rules: self.rules.len(),
        }
    }

    /// Audits the whole grammar.
    ///
    /// Walks every rule ring and checks link consistency, reference counts,
    /// rule utility, digram uniqueness and the validity of every index entry.
    pub fn verify(&self) -> Result<(), GrammarError> {
        let mut uses: HashMap<RuleId, u32> = HashMap::default();
        let mut seen: HashMap<Digram<T>, (NodeKey, RuleId)> = HashMap::default();

        for (&id, rule) in &self.rules {
            match self.nodes.get(rule.guard) {
                Some(guard) if guard.guard_of() == Some(id) => {}
                _ => return Err(InvariantViolation::BrokenLink(id).into()),
            }

            let mut prev = rule.guard;
            let mut current = self.nodes[rule.guard].next;
            let mut len = 0usize;

            loop {
                let Some(node) = self.nodes.get(current) else {
                    return Err(InvariantViolation::BrokenLink(id).into());
                };
                if node.prev != prev {
                    return Err(InvariantViolation::BrokenLink(id).into());
                }
                if current == rule.guard {
                    break;
                }

                match node.symbol() {
                    None => return Err(InvariantViolation::BrokenLink(id).into()),
                    Some(Symbol::Nonterminal(target)) => {
                        if !self.rules.contains_key(target) {
                            return Err(InvariantViolation::MissingRule(*target).into());
                        }
                        *uses.entry(*target).or_insert(0) += 1;
                    }
                    Some(Symbol::Terminal(_)) => {}
                }

                if let Some(digram) = self.digram_at(current) {
                    match seen.get(&digram) {
                        // Overlapping occurrences inside a run are allowed
                        Some(&(other, _)) if self.nodes[other].next == current => {}
                        Some(&(_, other_rule)) => {
                            return Err(InvariantViolation::DuplicateDigram {
                                first: other_rule,
                                second: id,
                            }
                            .into());
                        }
                        None => {
                            seen.insert(digram, (current, id));
                        }
                    }
                }

                len += 1;
                if len > self.nodes.len() {
                    return Err(InvariantViolation::BrokenLink(id).into());
                }
                prev = current;
                current = node.next;
            }

            if !id.is_start() && len == 0 {
                return Err(InvariantViolation::EmptyRule(id).into());
            }
        }

        for (&id, rule) in &self.rules {
            let actual = uses.get(&id).copied().unwrap_or(0);
            if rule.count != actual {
                return Err(InvariantViolation::CountMismatch {
                    rule: id,
                    recorded: rule.count,
                    actual,
                }
                .into());
            }
            if !id.is_start() && rule.count < 2 {
                return Err(InvariantViolation::UnderusedRule {
                    rule: id,
                    count: rule.count,
                }
                .into());
            }
        }

        for (digram, node) in self.digrams.iter() {
            if !self.nodes.contains_key(node) || self.digram_at(node).as_ref() != Some(digram) {
                return Err(InvariantViolation::StaleDigram.into());
            }
        }

        Ok(())
    }
}

impl<T: Hash + Eq + Clone> Default for Grammar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> Extend<T> for Grammar<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.consume_sequence(iter);
    }
}

impl<T: Hash + Eq + Clone> FromIterator<T> for Grammar<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut grammar = Self::new();
        grammar.consume_sequence(iter);
        grammar
    }
}

/// Statistics about the compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarStats {
    /// Number of input tokens consumed
    pub input_length: usize,
    /// Total symbols across all rule bodies
    pub grammar_symbols: usize,
    /// Number of rules, start rule included
    pub num_rules: usize,
}

impl GrammarStats {
    /// Returns the grammar size as a percentage of the input length.
    pub fn compression_ratio(&self) -> f64 {
        if self.input_length == 0 {
            0.0
        } else {
            (self.grammar_symbols as f64 / self.input_length as f64) * 100.0
        }
    }
}

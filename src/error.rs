use crate::symbol::RuleId;
use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A rule id was queried that is not part of the grammar
    #[error("Rule {0} not found")]
    RuleNotFound(RuleId),

    /// An exported snapshot refers back to a rule that is still being expanded
    #[error("Rule {0} refers to itself")]
    CyclicRule(RuleId),

    /// The grammar's internal bookkeeping is inconsistent
    #[error("Grammar invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Internal-consistency failures.
///
/// The engine panics when it meets one of these while consuming input;
/// [`Grammar::verify`](crate::Grammar::verify) reports them as values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("reference count of rule {0} dropped below zero")]
    ReferenceUnderflow(RuleId),

    #[error("attempted to dissolve the start rule")]
    StartRuleDissolution,

    #[error("digram index entry points at a removed or mismatched node")]
    StaleDigram,

    #[error("nonterminal refers to missing rule {0}")]
    MissingRule(RuleId),

    #[error("rule {rule} records {recorded} references but is used {actual} times")]
    CountMismatch {
        rule: RuleId,
        recorded: u32,
        actual: u32,
    },

    #[error("rule {rule} is used only {count} time(s)")]
    UnderusedRule { rule: RuleId, count: u32 },

    #[error("rule {0} has an empty body")]
    EmptyRule(RuleId),

    #[error("digram occurs more than once (first in rule {first}, again in rule {second})")]
    DuplicateDigram { first: RuleId, second: RuleId },

    #[error("ring of rule {0} has inconsistent links")]
    BrokenLink(RuleId),
}

/// Aborts on an internal-consistency violation.
#[cold]
#[track_caller]
pub(crate) fn violated(violation: InvariantViolation) -> ! {
    let err = GrammarError::from(violation);
    log::error!("{err}");
    panic!("{err}");
}

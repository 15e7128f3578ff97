use crate::symbol::RuleId;

/// Rule id allocator owned by a single grammar.
///
/// Ids of dissolved rules are handed out again so long inputs do not exhaust
/// the id space. The first id allocated is always the start rule's.
#[derive(Debug)]
pub(crate) struct IdGenerator {
    next: u32,
    freed: Vec<u32>,
}

impl IdGenerator {
    pub(crate) fn new() -> Self {
        Self {
            next: 0,
            freed: Vec::new(),
        }
    }

    /// Gets a new id, reusing a freed one if available.
    pub(crate) fn get(&mut self) -> RuleId {
        if let Some(id) = self.freed.pop() {
            RuleId(id)
        } else {
            let id = self.next;
            self.next += 1;
            RuleId(id)
        }
    }

    /// Marks an id as free for reuse.
    pub(crate) fn free(&mut self, id: RuleId) {
        assert!(id.0 < self.next, "Cannot free rule id that was never allocated");
        assert!(!id.is_start(), "The start rule id is never freed");
        self.freed.push(id.0);
    }
}

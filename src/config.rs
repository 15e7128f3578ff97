/// Construction-time settings for a [`Grammar`](crate::Grammar).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Run the full invariant audit after every consumed symbol and abort on
    /// the first violation. Quadratic; meant for tests and debugging.
    pub verify_invariants: bool,

    /// Expected input length, used to pre-size the node arena and the digram
    /// index.
    pub capacity: usize,
}

impl GrammarConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_invariants = enabled;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

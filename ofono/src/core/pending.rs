//! Tracking of property fetches that are still in flight.

use std::collections::HashSet;

/// Names of properties with an outstanding fetch.
///
/// Guarantees at most one in-flight fetch per name: a caller must win
/// [`try_begin`](Self::try_begin) before issuing a call, and the completion
/// path calls [`end`](Self::end) exactly once.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    names: HashSet<String>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` pending. Returns false if it already was.
    pub fn try_begin(&mut self, name: &str) -> bool {
        if self.names.contains(name) {
            return false;
        }
        self.names.insert(name.to_string());
        true
    }

    pub fn end(&mut self, name: &str) {
        self.names.remove(name);
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused() {
        let mut pending = PendingSet::new();
        assert!(pending.try_begin("Bearer"));
        assert!(!pending.try_begin("Bearer"));
        assert!(pending.is_pending("Bearer"));
    }

    #[test]
    fn end_allows_new_fetch() {
        let mut pending = PendingSet::new();
        assert!(pending.try_begin("Bearer"));
        pending.end("Bearer");
        assert!(!pending.is_pending("Bearer"));
        assert!(pending.try_begin("Bearer"));
    }

    #[test]
    fn names_are_independent() {
        let mut pending = PendingSet::new();
        assert!(pending.try_begin("Bearer"));
        assert!(pending.try_begin("Alphabet"));
        pending.end("Bearer");
        assert!(pending.is_pending("Alphabet"));
    }

    #[test]
    fn end_of_unknown_name_is_harmless() {
        let mut pending = PendingSet::new();
        pending.end("Nothing");
        assert!(pending.is_empty());
    }
}

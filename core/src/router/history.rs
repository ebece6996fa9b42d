use std::collections::VecDeque;

/// Bounded trail of dispatched paths, most recent last.
///
/// Only `navigate`-triggered dispatch appends. When the trail is full the
/// oldest entry is dropped.
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl NavigationHistory {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(64)),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.entries.push_back(path.into());
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop_back()
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

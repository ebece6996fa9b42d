//! The platform's own history/location layer.
//!
//! The router writes to it on `navigate` and reads the current location on
//! externally triggered navigation (back/forward buttons).

use std::cell::RefCell;

use courier_types::Location;

pub trait Platform {
    /// Current fragment path and search string.
    fn location(&self) -> Location;
    /// Add a new entry and make it current.
    fn push(&self, path: &str);
    /// Overwrite the current entry.
    fn replace(&self, path: &str);
}

#[derive(Debug)]
struct Entries {
    paths: Vec<String>,
    index: usize,
    search: String,
}

/// In-process platform history with back/forward support.
#[derive(Debug)]
pub struct MemoryPlatform {
    entries: RefCell<Entries>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryPlatform {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: RefCell::new(Entries {
                paths: vec![initial.into()],
                index: 0,
                search: String::new(),
            }),
        }
    }

    /// Replace the URL search string (leading `?` optional).
    pub fn set_search(&self, search: &str) {
        self.entries.borrow_mut().search = search.strip_prefix('?').unwrap_or(search).to_string();
    }

    /// Step back one entry. Returns `false` at the start of the stack.
    pub fn go_back(&self) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.index == 0 {
            return false;
        }
        entries.index -= 1;
        true
    }

    /// Step forward one entry. Returns `false` at the end of the stack.
    pub fn go_forward(&self) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.index + 1 >= entries.paths.len() {
            return false;
        }
        entries.index += 1;
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().paths.is_empty()
    }
}

impl Platform for MemoryPlatform {
    fn location(&self) -> Location {
        let entries = self.entries.borrow();
        let path = entries.paths.get(entries.index).cloned().unwrap_or_default();
        Location::new(path, entries.search.clone())
    }

    fn push(&self, path: &str) {
        let mut entries = self.entries.borrow_mut();
        let keep = entries.index + 1;
        entries.paths.truncate(keep);
        entries.paths.push(path.to_string());
        entries.index = entries.paths.len() - 1;
    }

    fn replace(&self, path: &str) {
        let mut entries = self.entries.borrow_mut();
        let index = entries.index;
        match entries.paths.get_mut(index) {
            Some(current) => *current = path.to_string(),
            None => entries.paths.push(path.to_string()),
        }
    }
}

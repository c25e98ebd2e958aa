//! Session history
//!
//! history.pushState / replaceState / back / forward / go over a list of
//! entries with a cursor. State objects are stored serialized.

/// Session history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub url: String,
    /// JSON-serialized state object
    pub state: Option<String>,
}

/// History manager
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: Vec<SessionEntry>,
    current: usize,
}

impl SessionHistory {
    pub fn new(initial_url: &str) -> Self {
        Self {
            entries: vec![SessionEntry {
                url: initial_url.to_string(),
                state: None,
            }],
            current: 0,
        }
    }

    /// Push a new history entry
    pub fn push_state(&mut self, state: Option<String>, url: String) {
        // Remove forward history
        self.entries.truncate(self.current + 1);

        self.entries.push(SessionEntry { url, state });
        self.current = self.entries.len() - 1;
    }

    /// Replace current entry
    pub fn replace_state(&mut self, state: Option<String>, url: String) {
        if let Some(entry) = self.entries.get_mut(self.current) {
            entry.url = url;
            entry.state = state;
        }
    }

    pub fn back(&mut self) -> Option<&SessionEntry> {
        self.go(-1)
    }

    pub fn forward(&mut self) -> Option<&SessionEntry> {
        self.go(1)
    }

    /// Move by `delta` entries; out of range leaves the cursor alone
    pub fn go(&mut self, delta: i32) -> Option<&SessionEntry> {
        if delta == 0 {
            return None;
        }
        let target = self.current.checked_add_signed(delta as isize)?;
        if target >= self.entries.len() {
            return None;
        }
        self.current = target;
        self.entries.get(target)
    }

    pub fn current(&self) -> Option<&SessionEntry> {
        self.entries.get(self.current)
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn length(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }
}

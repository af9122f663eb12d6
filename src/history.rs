//! Bounded ring of accepted command lines.

/// Number of lines the shell remembers.
pub const CAPACITY: usize = 512;

/// In-memory command history.
///
/// A fixed-capacity ring: storing a line advances a write cursor modulo
/// [`CAPACITY`], evicting whatever the slot held before. Lookup is by age:
/// `get(0)` is the most recently added line. Only the shell loop touches it,
/// so there is no interior locking.
pub struct History {
    entries: Vec<Option<String>>,
    cursor: usize,
    len: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: vec![None; CAPACITY],
            cursor: 0,
            len: 0,
        }
    }

    /// Store a copy of `line` as the newest entry.
    pub fn add(&mut self, line: &str) {
        self.entries[self.cursor] = Some(line.to_string());
        self.cursor = (self.cursor + 1) % CAPACITY;
        self.len = (self.len + 1).min(CAPACITY);
    }

    /// The `age`-th most recent entry; `age` 0 is the newest.
    pub fn get(&self, age: usize) -> Option<&str> {
        if age >= self.len {
            return None;
        }
        let slot = (self.cursor + CAPACITY - 1 - age) % CAPACITY;
        self.entries[slot].as_deref()
    }

    /// How many entries are populated (at most [`CAPACITY`]).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::{vec_deque, VecDeque};

/// A bounded command history with Up/Down navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History<const N: usize> {
    /// Last read value, counted from the newest entry, none if on a clean line
    cur: Option<usize>,
    stored_commands: VecDeque<String>,
}

impl<const N: usize> History<N> {
    /// The capacity of this History
    pub const CAPACITY: usize = N;

    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history containing the last [Self::CAPACITY] entries of the given iterator.
    pub fn with_initial(initial: impl IntoIterator<Item = String>) -> Self {
        let mut me = Self::new();
        for command in initial {
            me.push(command);
        }
        me
    }

    pub fn len(&self) -> usize {
        self.stored_commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored_commands.is_empty()
    }

    /// Push entry to the end of the history, dropping the oldest entry if the capacity is reached
    ///
    /// Blank commands and repeats of the newest entry are not stored. Either way the
    /// navigation pointer is reset, so the next [Self::prev] returns the newest entry.
    pub fn push(&mut self, command: String) {
        self.cur = None;
        if N == 0 || command.trim().is_empty() || self.newest() == Some(command.as_str()) {
            return;
        }
        if self.stored_commands.len() == N {
            self.stored_commands.pop_front();
        }
        self.stored_commands.push_back(command);
    }

    /// Pop the newest entry of the history
    pub fn pop(&mut self) -> Option<String> {
        self.cur = None;
        self.stored_commands.pop_back()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.stored_commands.get(idx).map(String::as_str)
    }

    /// Get a reference to the newest element
    pub fn newest(&self) -> Option<&str> {
        self.stored_commands.back().map(String::as_str)
    }

    /// Get a reference to the current element
    pub fn current(&self) -> Option<&str> {
        let cur = self.cur?;
        self.get(self.len().checked_sub(cur + 1)?)
    }

    /// Move the current pointer one entry back in time and return that entry
    pub fn prev(&mut self) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        self.cur = Some(match self.cur {
            Some(cur) if cur + 1 < self.len() => cur + 1,
            Some(cur) => cur,
            None => 0,
        });
        self.current()
    }

    /// Move the current pointer one entry forward in time and return that entry
    ///
    /// Stepping past the newest entry returns to a clean line and yields `None`.
    pub fn next(&mut self) -> Option<&str> {
        match self.cur {
            None | Some(0) => {
                self.cur = None;
                None
            }
            Some(cur) => {
                self.cur = Some(cur - 1);
                self.current()
            }
        }
    }

    /// Leave navigation mode without changing the stored entries
    pub fn reset(&mut self) {
        self.cur = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.stored_commands.iter().map(String::as_str)
    }
}

impl<const N: usize> IntoIterator for History<N> {
    type Item = String;
    type IntoIter = vec_deque::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.stored_commands.into_iter()
    }
}

impl<const N: usize> Default for History<N> {
    fn default() -> Self {
        Self {
            cur: None,
            stored_commands: VecDeque::with_capacity(N),
        }
    }
}

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Down,
    Up,
}

/// Last observed status per target name.
///
/// A target with no previous observation is assumed up, so its first
/// failing result reports `Down` while a first healthy result reports nothing.
#[derive(Debug, Default)]
pub struct StatusTracker {
    previous: HashMap<String, bool>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `success` for `name` and returns the transition it causes.
    pub fn observe(&mut self, name: &str, success: bool) -> Option<Transition> {
        let previous = self.previous.insert(name.to_owned(), success).unwrap_or(true);
        match (previous, success) {
            (true, false) => Some(Transition::Down),
            (false, true) => Some(Transition::Up),
            _ => None,
        }
    }

    pub fn last_status(&self, name: &str) -> Option<bool> {
        self.previous.get(name).copied()
    }

    /// Drops every entry whose name is not in `names`.
    pub fn retain(&mut self, names: &HashSet<&str>) {
        self.previous.retain(|name, _| names.contains(name.as_str()));
    }
}

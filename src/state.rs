// src/state.rs
//! Loop-owned memory: which identity keys were already handled, and whether
//! the bot is still in its first cycle. Each bot owns its own instance.

use std::collections::{HashSet, VecDeque};

/// Process-lifetime set of identity keys.
///
/// Unbounded unless a capacity is given; with a capacity the oldest keys are
/// evicted first, which lets a very old duplicate fire again.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    keys: HashSet<String>,
    order: VecDeque<String>,
    cap: Option<usize>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(cap: usize) -> Self {
        Self {
            cap: Some(cap.max(1)),
            ..Self::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Returns `true` if the key was not present before.
    pub fn insert(&mut self, key: &str) -> bool {
        if !self.keys.insert(key.to_string()) {
            return false;
        }
        if let Some(cap) = self.cap {
            self.order.push_back(key.to_string());
            while self.order.len() > cap {
                if let Some(old) = self.order.pop_front() {
                    self.keys.remove(&old);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Seen keys plus the first-run flag for one bot.
#[derive(Debug, Clone)]
pub struct RelayState {
    seen: SeenSet,
    first_run: bool,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new(SeenSet::new())
    }
}

impl RelayState {
    pub fn new(seen: SeenSet) -> Self {
        Self {
            seen,
            first_run: true,
        }
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// Record `key` and decide whether it should be announced.
    ///
    /// The key is stored in every case, including during the first run.
    pub fn should_notify(&mut self, key: &str) -> bool {
        let fresh = self.seen.insert(key);
        fresh && !self.first_run
    }

    /// Called once a cycle has run to completion.
    pub fn finish_cycle(&mut self) {
        self.first_run = false;
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }
}

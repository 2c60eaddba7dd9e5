//! Material resolution
//!
//! Materials are compiled GPU programs owned by the backend; effects refer
//! to them by name. A missing name is a configuration error, not a runtime
//! fault: the owning effect skips all its GPU work for the frame and the
//! failure is logged exactly once per name per session, never per frame.

use std::collections::{HashMap, HashSet};

use crate::command::MaterialId;

/// Resolves material names to compiled GPU programs
pub trait MaterialProvider {
    fn resolve(&self, name: &str) -> Option<MaterialId>;
}

/// Simple in-memory provider for tests and headless use
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    ids: HashMap<String, MaterialId>,
    next: u32,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, returning its id; idempotent
    pub fn register(&mut self, name: &str) -> MaterialId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = MaterialId(self.next);
        self.next += 1;
        self.ids.insert(name.to_owned(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl MaterialProvider for MaterialRegistry {
    fn resolve(&self, name: &str) -> Option<MaterialId> {
        self.ids.get(name).copied()
    }
}

/// Once-per-session diagnostics for missing references
///
/// Keeps the log clean when a reference stays missing across hundreds of
/// consecutive frames.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: HashSet<String>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` the first time `key` is reported; returns true when
    /// the message was actually emitted
    pub fn warn(&mut self, key: &str, message: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_owned());
        log::warn!("{}", message);
        true
    }

    /// Number of distinct keys reported so far
    pub fn reported(&self) -> usize {
        self.seen.len()
    }

    /// Forget everything, e.g. after a reload resolves references
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

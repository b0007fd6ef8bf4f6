//! Observable page state: visual flags and gates.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::watch;

/// What the render layer sees of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    visuals: BTreeMap<String, String>,
    open_gates: BTreeSet<String>,
}

impl PageSnapshot {
    /// Current value of a visual key.
    #[must_use]
    pub fn visual(&self, key: &str) -> Option<&str> {
        self.visuals.get(key).map(String::as_str)
    }

    /// Whether the named gate is open.
    #[must_use]
    pub fn gate(&self, name: &str) -> bool {
        self.open_gates.contains(name)
    }

    /// Names of all open gates.
    #[must_use]
    pub fn open_gates(&self) -> Vec<&str> {
        self.open_gates.iter().map(String::as_str).collect()
    }
}

/// Publisher side of a page's state. Cloning yields another publisher for the
/// same page.
#[derive(Debug, Clone)]
pub struct PageState {
    tx: watch::Sender<PageSnapshot>,
}

impl PageState {
    /// Creates an empty page state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(PageSnapshot::default()),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PageSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribes the render layer to changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PageSnapshot> {
        self.tx.subscribe()
    }

    /// Sets a visual key, notifying subscribers only on change.
    pub fn set_visual(&self, key: &str, value: &str) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.visual(key) == Some(value) {
                return false;
            }
            snapshot.visuals.insert(key.to_owned(), value.to_owned());
            true
        });
    }

    /// Removes a visual key.
    pub fn clear_visual(&self, key: &str) {
        self.tx
            .send_if_modified(|snapshot| snapshot.visuals.remove(key).is_some());
    }

    /// Opens a gate. Returns `true` only if the gate was closed before.
    pub fn unlock(&self, gate: &str) -> bool {
        self.tx
            .send_if_modified(|snapshot| snapshot.open_gates.insert(gate.to_owned()))
    }

    /// Whether the named gate is open.
    #[must_use]
    pub fn is_open(&self, gate: &str) -> bool {
        self.tx.borrow().gate(gate)
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::new()
    }
}

//! State Tree
//!
//! The single source of truth for a store. A `StateTree` is an immutable
//! snapshot: merging produces a new tree and leaves the old one untouched,
//! so anyone still holding the previous snapshot keeps a consistent view.
//!
//! # Memory Layout
//!
//! The mapping lives behind an `Arc`. Cloning a tree is a reference count
//! bump, and replacing the store's tree is a single pointer swap.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// An ordered key/value mapping. Used for the state tree, partial state
/// contributions, setter results and derived state.
pub type StateMap = serde_json::Map<String, Value>;

/// An immutable snapshot of the global state.
#[derive(Clone, Default, PartialEq)]
pub struct StateTree {
    entries: Arc<StateMap>,
}

impl StateTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Clone the value under `key`, or `Value::Null` if it is absent.
    ///
    /// This is the usual shape of a selector body: `|state| state.value("name")`.
    pub fn value(&self, key: &str) -> Value {
        self.entries.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Whether a top-level key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrow the underlying mapping, in insertion order.
    pub fn as_map(&self) -> &StateMap {
        &self.entries
    }

    /// Produce a new snapshot with `partial` merged over this one.
    ///
    /// Existing keys are overwritten, new keys are appended. `self` is not
    /// modified.
    pub fn merge(&self, partial: StateMap) -> StateTree {
        let mut next = StateMap::clone(&self.entries);
        for (key, value) in partial {
            next.insert(key, value);
        }
        StateTree {
            entries: Arc::new(next),
        }
    }

    /// Whether two trees are the very same snapshot.
    pub fn ptr_eq(&self, other: &StateTree) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl From<StateMap> for StateTree {
    fn from(entries: StateMap) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl Serialize for StateTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Middleware Chain
//!
//! A chain of responsibility wrapped around every dispatch. Each handler
//! receives the payload and a [`Next`] continuation:
//!
//! - `next.run(payload)` hands the (possibly transformed) payload to the
//!   following handler, and after the last handler, to the terminal step.
//! - Returning without calling `next` ends the chain. Nothing after it runs,
//!   including the terminal step that applies the reducer.
//!
//! Handlers are matched either against every action ([`Matcher::Any`]) or a
//! single action name. Both kinds run interleaved, in registration order.
//!
//! # Snapshot Iteration
//!
//! `handle` takes a snapshot of the matching entries before running any of
//! them. Adding or removing handlers while a chain is running affects the
//! next dispatch, never the current one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::HandlerError;

/// A middleware handler.
pub type Handler = Arc<dyn Fn(Value, Next<'_>) -> Result<(), HandlerError> + Send + Sync>;

/// The step run after the last handler calls `next`.
pub type Terminal<'a> = &'a dyn Fn(Value) -> Result<(), HandlerError>;

/// Unique identifier for a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiddlewareId(u64);

impl MiddlewareId {
    /// Generate a new unique middleware ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MiddlewareId {
    fn default() -> Self {
        Self::new()
    }
}

/// Which actions a handler runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Every dispatched action.
    Any,
    /// Only the named action.
    Action(String),
}

impl Matcher {
    pub fn matches(&self, action: &str) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Action(name) => name == action,
        }
    }
}

struct Entry {
    id: MiddlewareId,
    matcher: Matcher,
    handler: Handler,
}

type Entries = RwLock<Vec<Arc<Entry>>>;

/// Continuation handed to each handler.
///
/// Consumed by [`Next::run`], so a handler can continue the chain at most
/// once.
pub struct Next<'a> {
    action: &'a str,
    rest: &'a [Arc<Entry>],
    terminal: Terminal<'a>,
}

impl<'a> Next<'a> {
    /// The action being dispatched.
    pub fn action(&self) -> &str {
        self.action
    }

    /// Continue the chain with `payload`.
    pub fn run(self, payload: Value) -> Result<(), HandlerError> {
        match self.rest.split_first() {
            Some((entry, rest)) => (entry.handler)(
                payload,
                Next {
                    action: self.action,
                    rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(payload),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("action", &self.action)
            .field("remaining", &self.rest.len())
            .finish()
    }
}

/// Handle returned when a handler is registered.
///
/// Call [`MiddlewareHandle::remove`] to unregister. Dropping the handle does
/// not unregister the handler.
#[derive(Clone)]
pub struct MiddlewareHandle {
    id: MiddlewareId,
    entries: Weak<Entries>,
}

impl MiddlewareHandle {
    /// The handler's identifier, accepted by [`MiddlewareChain::remove`].
    pub fn id(&self) -> MiddlewareId {
        self.id
    }

    /// Unregister the handler.
    ///
    /// Returns `true` if this call removed it. Later calls, or calls after
    /// the chain is gone, return `false`.
    pub fn remove(&self) -> bool {
        match self.entries.upgrade() {
            Some(entries) => remove_entry(&entries, self.id),
            None => false,
        }
    }
}

impl fmt::Debug for MiddlewareHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareHandle").field("id", &self.id).finish()
    }
}

fn remove_entry(entries: &Entries, id: MiddlewareId) -> bool {
    let mut entries = entries.write();
    let before = entries.len();
    entries.retain(|entry| entry.id != id);
    entries.len() != before
}

/// Ordered list of handlers.
#[derive(Default)]
pub struct MiddlewareChain {
    entries: Arc<Entries>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn add<F>(&self, matcher: Matcher, handler: F) -> MiddlewareHandle
    where
        F: Fn(Value, Next<'_>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = MiddlewareId::new();
        self.entries.write().push(Arc::new(Entry {
            id,
            matcher,
            handler: Arc::new(handler),
        }));

        MiddlewareHandle {
            id,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Remove a handler by ID.
    pub fn remove(&self, id: MiddlewareId) -> bool {
        remove_entry(&self.entries, id)
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Run the chain for `action`, ending in `terminal`.
    ///
    /// Returns the first error a handler propagates. `terminal` runs at most
    /// once, and only if every handler called `next`.
    pub fn handle(
        &self,
        action: &str,
        payload: Value,
        terminal: Terminal<'_>,
    ) -> Result<(), HandlerError> {
        let snapshot: Vec<Arc<Entry>> = self
            .entries
            .read()
            .iter()
            .filter(|entry| entry.matcher.matches(action))
            .cloned()
            .collect();

        tracing::trace!(action, handlers = snapshot.len(), "running middleware chain");

        Next {
            action,
            rest: &snapshot,
            terminal,
        }
        .run(payload)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

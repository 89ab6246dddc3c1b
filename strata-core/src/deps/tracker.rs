//! Dependency Tracker
//!
//! Keeps one [`DependencyRecord`] per attached component. Records are added
//! when a component attaches with a state declaration and removed when it
//! detaches.
//!
//! # Weak References
//!
//! Records hold a `Weak` to the component, mirroring how the host owns the
//! component and the store only observes it. A record whose component is
//! gone is skipped during propagation and pruned afterwards, so a host that
//! tears a component down without calling `detach` (or calls it late) never
//! leaves the store pushing into freed state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::component::{ComponentKind, StateSelectors, UpdateHooks, ViewBinding};
use crate::state::{StateMap, StateTree};

/// Unique identifier for a dependency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyId(u64);

impl DependencyId {
    /// Generate a new unique dependency ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for DependencyId {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of the component allocation, used for identity comparisons.
///
/// The record's `Weak` keeps the allocation reserved, so an address cannot
/// be reused by another component while the record exists.
fn component_addr(component: &Arc<dyn ViewBinding>) -> *const () {
    Arc::as_ptr(component) as *const ()
}

/// A component's subscription to derived state.
pub struct DependencyRecord {
    id: DependencyId,
    component: Weak<dyn ViewBinding>,
    kind: ComponentKind,
    selectors: StateSelectors,
    hooks: UpdateHooks,
    /// Derived state as last pushed into the component's view.
    pushed: RwLock<StateMap>,
}

impl DependencyRecord {
    pub(crate) fn new(
        component: &Arc<dyn ViewBinding>,
        kind: ComponentKind,
        selectors: StateSelectors,
        hooks: UpdateHooks,
        initial: StateMap,
    ) -> Self {
        Self {
            id: DependencyId::new(),
            component: Arc::downgrade(component),
            kind,
            selectors,
            hooks,
            pushed: RwLock::new(initial),
        }
    }

    /// Identifier used in log fields.
    pub fn id(&self) -> DependencyId {
        self.id
    }

    /// Page or component, as given at attach time.
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Shorthand for `kind().is_page()`.
    pub fn is_page(&self) -> bool {
        self.kind.is_page()
    }

    /// The component's update hooks.
    pub fn hooks(&self) -> &UpdateHooks {
        &self.hooks
    }

    /// The component, if the host still holds it.
    pub fn component(&self) -> Option<Arc<dyn ViewBinding>> {
        self.component.upgrade()
    }

    /// Whether the host still holds the component.
    pub fn is_alive(&self) -> bool {
        self.component.strong_count() > 0
    }

    /// Whether this record belongs to `component`.
    pub fn is_for(&self, component: &Arc<dyn ViewBinding>) -> bool {
        std::ptr::eq(self.component.as_ptr() as *const (), component_addr(component))
    }

    /// Compute derived state from `state`.
    pub fn create_state(&self, state: &StateTree) -> StateMap {
        self.selectors.evaluate(state)
    }

    /// The derived state most recently pushed to the component.
    pub fn pushed_state(&self) -> StateMap {
        self.pushed.read().clone()
    }

    pub(crate) fn set_pushed_state(&self, state: StateMap) {
        *self.pushed.write() = state;
    }
}

impl fmt::Debug for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("selectors", &self.selectors)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// The set of dependency records owned by a store.
#[derive(Default)]
pub struct DependencyTracker {
    records: RwLock<Vec<Arc<DependencyRecord>>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, replacing any existing record for the same component.
    ///
    /// Returns `true` if a previous record was replaced.
    pub fn insert(&self, component: &Arc<dyn ViewBinding>, record: Arc<DependencyRecord>) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|existing| !existing.is_for(component));
        let replaced = records.len() != before;
        records.push(record);
        replaced
    }

    /// Remove the record for `component`. Returns `true` if one was removed.
    pub fn remove(&self, component: &Arc<dyn ViewBinding>) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|record| !record.is_for(component));
        records.len() != before
    }

    /// Whether `component` has a record.
    pub fn contains(&self, component: &Arc<dyn ViewBinding>) -> bool {
        self.records.read().iter().any(|record| record.is_for(component))
    }

    /// Drop records whose component no longer exists. Returns how many.
    pub fn prune(&self) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|record| record.is_alive());
        before - records.len()
    }

    /// Clone the current record list so it can be walked without the lock.
    pub fn snapshot(&self) -> Vec<Arc<DependencyRecord>> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("len", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl ViewBinding for Silent {
        fn push_derived_state(&self, _data: &StateMap) {}
    }

    fn component() -> Arc<dyn ViewBinding> {
        Arc::new(Silent)
    }

    fn record_for(component: &Arc<dyn ViewBinding>) -> Arc<DependencyRecord> {
        Arc::new(DependencyRecord::new(
            component,
            ComponentKind::Component,
            StateSelectors::new(),
            UpdateHooks::new(),
            StateMap::new(),
        ))
    }

    #[test]
    fn insert_and_remove_by_identity() {
        let tracker = DependencyTracker::new();
        let first = component();
        let second = component();

        tracker.insert(&first, record_for(&first));
        tracker.insert(&second, record_for(&second));
        assert_eq!(tracker.len(), 2);

        assert!(tracker.remove(&first));
        assert!(!tracker.contains(&first));
        assert!(tracker.contains(&second));
        assert!(!tracker.remove(&first));
    }

    #[test]
    fn insert_replaces_existing_record() {
        let tracker = DependencyTracker::new();
        let comp = component();

        assert!(!tracker.insert(&comp, record_for(&comp)));
        assert!(tracker.insert(&comp, record_for(&comp)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn prune_drops_dead_components() {
        let tracker = DependencyTracker::new();
        let kept = component();
        let dropped = component();

        tracker.insert(&kept, record_for(&kept));
        tracker.insert(&dropped, record_for(&dropped));
        drop(dropped);

        assert_eq!(tracker.prune(), 1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.contains(&kept));
    }

    #[test]
    fn record_ids_are_unique() {
        let comp = component();
        let a = record_for(&comp);
        let b = record_for(&comp);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn dead_record_is_not_alive() {
        let comp = component();
        let record = record_for(&comp);
        assert!(record.is_alive());
        assert!(record.component().is_some());

        drop(comp);
        assert!(!record.is_alive());
        assert!(record.component().is_none());
    }
}

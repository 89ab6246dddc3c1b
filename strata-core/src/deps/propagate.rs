//! Diff/Patch Propagator
//!
//! Runs after every state replacement and brings each dependent's view up to
//! date.
//!
//! # How It Works
//!
//! For each dependency record, independently:
//!
//! 1. Recompute derived state by applying the record's selectors to the new
//!    state tree.
//! 2. Diff it against the derived state last pushed to the component. No
//!    patches means nothing changed: the component is left alone and no hook
//!    runs.
//! 3. Ask `will_update`. `Ok(false)` vetoes: nothing is pushed and
//!    `did_update` does not run. The record keeps its previous pushed state,
//!    so the next diff is still taken against what the view actually shows.
//! 4. Push `{namespace: derived}` to the component and remember it.
//! 5. Call `did_update` with the derived state and the patch list.
//!
//! A veto, a hook error or a panic in user code affects only its own
//! component. Panics are caught per record and counted as failures.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::component::namespaced;
use super::tracker::DependencyRecord;
use crate::diff::diff;
use crate::error::HandlerError;
use crate::state::StateTree;

/// Counts of what happened to each dependent during one propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Derived state pushed to the component.
    pub updated: usize,
    /// Derived state did not change.
    pub unchanged: usize,
    /// `will_update` returned `Ok(false)`.
    pub vetoed: usize,
    /// A hook returned an error, or user code panicked.
    pub failed: usize,
    /// The component was already gone.
    pub stale: usize,
}

impl PropagationReport {
    fn absorb(&mut self, other: PropagationReport) {
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.vetoed += other.vetoed;
        self.failed += other.failed;
        self.stale += other.stale;
    }
}

/// Pushes derived state changes to dependents.
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'a> {
    namespace: &'a str,
}

impl<'a> Propagator<'a> {
    /// Create a propagator writing under `namespace`.
    pub fn new(namespace: &'a str) -> Self {
        Self { namespace }
    }

    /// Propagate `state` to every record.
    pub fn update(&self, records: &[Arc<DependencyRecord>], state: &StateTree) -> PropagationReport {
        let mut report = PropagationReport::default();
        for record in records {
            let mut outcome = PropagationReport::default();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.update_one(record, state, &mut outcome)
            }));

            if let Err(payload) = result {
                let error = HandlerError::from_panic(payload);
                tracing::warn!(dependency = ?record.id(), %error, "update of component panicked");
                // Whatever the record counted before panicking is replaced by one failure.
                outcome = PropagationReport {
                    failed: 1,
                    ..PropagationReport::default()
                };
            }
            report.absorb(outcome);
        }
        report
    }

    fn update_one(&self, record: &DependencyRecord, state: &StateTree, report: &mut PropagationReport) {
        let Some(component) = record.component() else {
            report.stale += 1;
            return;
        };

        let next = record.create_state(state);
        let patches = diff(&record.pushed_state(), &next);
        if patches.is_empty() {
            report.unchanged += 1;
            return;
        }

        if let Some(will_update) = &record.hooks().will_update {
            match will_update(component.as_ref(), &next) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::trace!(dependency = ?record.id(), "update vetoed");
                    report.vetoed += 1;
                    return;
                }
                Err(error) => {
                    tracing::warn!(
                        dependency = ?record.id(),
                        %error,
                        "will_update hook failed, skipping component"
                    );
                    report.failed += 1;
                    return;
                }
            }
        }

        component.push_derived_state(&namespaced(self.namespace, &next));
        record.set_pushed_state(next.clone());
        tracing::trace!(dependency = ?record.id(), patches = patches.len(), "pushed derived state");

        if let Some(did_update) = &record.hooks().did_update {
            if let Err(error) = did_update(component.as_ref(), &next, &patches) {
                tracing::warn!(dependency = ?record.id(), %error, "did_update hook failed");
                report.failed += 1;
            }
        }

        report.updated += 1;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Dependency Tracking
//!
//! Components declare which parts of the global state they care about by
//! providing named selectors. The store remembers each such component in a
//! dependency record and, after every dispatch, pushes only the derived
//! state that actually changed.
//!
//! # Concepts
//!
//! ## Derived State
//!
//! The mapping produced by applying a component's selectors to the global
//! state tree. It is what the component binds into its view, under the
//! store's namespace key.
//!
//! ## Dependents
//!
//! Components with an active dependency record. The store holds them weakly;
//! the host's lifecycle system owns them and calls `attach`/`detach`.
//!
//! ## Propagation
//!
//! Recompute, diff, ask `will_update`, push, report to `did_update`. See
//! [`Propagator`].

mod component;
mod propagate;
mod tracker;

pub use component::{
    ComponentKind, DidUpdate, Selector, StateSelectors, UpdateHooks, ViewBinding, WillUpdate,
};
pub(crate) use component::namespaced;
pub use propagate::{PropagationReport, Propagator};
pub use tracker::{DependencyId, DependencyRecord, DependencyTracker};

/// What happened when a component attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// A dependency record was created and initial state pushed.
    Subscribed,
    /// The component declared no dependency on global state.
    NoDependency,
    /// The declaration was unusable (no selectors). Nothing was tracked.
    Rejected,
}

//! Store
//!
//! The store is the central coordinator. It owns the state tree, the reducer
//! registry, the middleware chain and the dependency records, and runs the
//! dispatch pipeline that connects them.
//!
//! # How a Dispatch Works
//!
//! 1. Take the dispatching flag. If it is already held, fail with
//!    `Reentrancy`: dispatch never nests.
//! 2. Look up the reducer. Unknown actions fail with `UnknownAction`.
//! 3. Run the middleware chain for the action. Handlers may transform the
//!    payload, or stop the chain by not calling `next`.
//! 4. If the chain reaches its end, the terminal step runs the setter,
//!    merges its result into a new state snapshot, swaps it in, and
//!    propagates to every dependent.
//! 5. Release the flag. Only then is a handler or setter error reported, to
//!    the `middleware_error` hook if configured or as a warning otherwise.
//!
//! Handler errors never reach the caller of `dispatch`. A setter error is
//! reported even if a handler discards what `next.run` returned. Panics in
//! handlers, setters and update hooks are caught and reported as errors.
//!
//! # Thread Safety
//!
//! `Store` is a cheap handle around shared state and can be cloned into
//! hooks and handlers. No internal lock is held while user code runs, so
//! user code may call back into the store freely. A nested dispatch fails
//! with `Reentrancy`; it never deadlocks.

mod config;
mod guard;
mod template;

pub use config::{AddDepHook, ErrorHook, StoreConfig, StoreHooks, DEFAULT_NAMESPACE};
pub use guard::DispatchGuard;
pub use template::{ComponentDefinition, ComponentTemplate, StateDeclaration};

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::deps::{
    namespaced, AttachOutcome, ComponentKind, DependencyRecord, DependencyTracker,
    PropagationReport, Propagator, StateSelectors, UpdateHooks, ViewBinding,
};
use crate::error::{HandlerError, Result, StoreError};
use crate::middleware::{Matcher, MiddlewareChain, MiddlewareHandle, Next};
use crate::state::{Reducer, ReducerDescriptor, ReducerRegistry, StateTree};

struct StoreInner {
    state: RwLock<StateTree>,
    reducers: RwLock<ReducerRegistry>,
    middleware: MiddlewareChain,
    deps: DependencyTracker,
    dispatching: AtomicBool,
    namespace: RwLock<String>,
    hooks: StoreHooks,
}

/// A global state container.
///
/// # Example
///
/// ```rust,ignore
/// let store = Store::new();
/// store.register(
///     "rename",
///     ReducerDescriptor::new()
///         .partial_state(json!({ "name": "tao" }))
///         .setter(|_state, payload| {
///             let mut update = StateMap::new();
///             update.insert("name".into(), payload);
///             Ok(update)
///         }),
/// )?;
///
/// store.dispatch("rename", "taotao")?;
/// assert_eq!(store.state().value("name"), json!("taotao"));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create a store with default configuration and no hooks.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a store.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    // ------------------------------------------------------------------------
    // Reducers
    // ------------------------------------------------------------------------

    /// Register a reducer for `action`.
    ///
    /// Its initial state is merged into the state tree immediately.
    pub fn register(&self, action: &str, descriptor: ReducerDescriptor) -> Result<()> {
        let has_setter = descriptor.has_setter();

        // Lock order: registry, then state.
        let mut reducers = self.inner.reducers.write();
        let mut state = self.inner.state.write();

        let contribution = reducers.register(&state, action, descriptor)?;
        let keys = contribution.len();
        *state = state.merge(contribution);

        if !has_setter {
            tracing::warn!(action, "registered without a setter, dispatching it will do nothing");
        }
        tracing::debug!(action, keys, "registered reducer");
        Ok(())
    }

    /// Whether a reducer is registered for `action`.
    pub fn has_reducer(&self, action: &str) -> bool {
        self.inner.reducers.read().contains(action)
    }

    /// Number of registered reducers.
    pub fn reducer_count(&self) -> usize {
        self.inner.reducers.read().len()
    }

    // ------------------------------------------------------------------------
    // Middleware
    // ------------------------------------------------------------------------

    /// Add a handler that runs for every action.
    pub fn use_middleware<F>(&self, handler: F) -> MiddlewareHandle
    where
        F: Fn(Value, Next<'_>) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.inner.middleware.add(Matcher::Any, handler)
    }

    /// Add a handler that runs only for `action`.
    pub fn use_action_middleware<F>(&self, action: &str, handler: F) -> MiddlewareHandle
    where
        F: Fn(Value, Next<'_>) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.inner
            .middleware
            .add(Matcher::Action(action.to_owned()), handler)
    }

    /// Number of registered middleware handlers, of both kinds.
    pub fn middleware_count(&self) -> usize {
        self.inner.middleware.len()
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatch `action` with `payload`.
    ///
    /// Fails only for a nested dispatch or an unknown action. Errors raised
    /// by handlers or the setter are reported through the store's hooks.
    pub fn dispatch(&self, action: &str, payload: impl Into<Value>) -> Result<()> {
        let span = tracing::debug_span!("dispatch", action);
        let _enter = span.enter();

        let Some(guard) = DispatchGuard::acquire(&self.inner.dispatching) else {
            tracing::debug!("rejected nested dispatch");
            return Err(StoreError::Reentrancy {
                action: action.to_owned(),
            });
        };

        let reducer = self
            .inner
            .reducers
            .read()
            .get(action)
            .ok_or_else(|| StoreError::UnknownAction {
                action: action.to_owned(),
            })?;

        let payload = payload.into();
        let original = payload.clone();

        // The terminal step keeps its own failure, so a handler that drops
        // the result of `next.run` cannot hide a setter error.
        let setter_failure: Cell<Option<HandlerError>> = Cell::new(None);
        let terminal = |payload: Value| -> std::result::Result<(), HandlerError> {
            if let Err(error) = self.apply(&reducer, payload) {
                setter_failure.set(Some(error));
            }
            Ok(())
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.inner.middleware.handle(action, payload, &terminal)
        }))
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));

        drop(guard);

        if let Some(error) = setter_failure.take() {
            self.report_error(action, &original, &error);
        }
        if let Err(error) = outcome {
            self.report_error(action, &original, &error);
        }
        Ok(())
    }

    /// Whether a dispatch is currently running on this store.
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.load(Ordering::Acquire)
    }

    /// Terminal step: run the setter, swap in the merged state, propagate.
    fn apply(&self, reducer: &Reducer, payload: Value) -> std::result::Result<(), HandlerError> {
        let current = self.state();
        let update = reducer.apply(&current, payload)?;
        let changed = update.len();

        let next = {
            let mut state = self.inner.state.write();
            let next = state.merge(update);
            *state = next.clone();
            next
        };
        tracing::debug!(keys = changed, "state replaced");

        let report = self.propagate(&next);
        tracing::debug!(
            updated = report.updated,
            unchanged = report.unchanged,
            vetoed = report.vetoed,
            failed = report.failed,
            "propagated"
        );
        Ok(())
    }

    fn propagate(&self, state: &StateTree) -> PropagationReport {
        let namespace = self.namespace();
        let records = self.inner.deps.snapshot();
        let report = Propagator::new(&namespace).update(&records, state);

        if report.stale > 0 {
            let pruned = self.inner.deps.prune();
            tracing::debug!(pruned, "pruned dependents of dropped components");
        }
        report
    }

    fn report_error(&self, action: &str, payload: &Value, error: &HandlerError) {
        match &self.inner.hooks.middleware_error {
            Some(hook) => hook(action, payload, error),
            None => tracing::warn!(action, %error, "dispatch failed"),
        }
    }

    // ------------------------------------------------------------------------
    // Dependents
    // ------------------------------------------------------------------------

    /// Host extension point: a component was attached.
    ///
    /// `declare` is invoked once with the store and returns the component's
    /// selectors, or `None` for no dependency. On success the initial derived
    /// state is pushed to the component straight away.
    pub fn attach<F>(
        &self,
        component: &Arc<dyn ViewBinding>,
        kind: ComponentKind,
        declare: F,
        hooks: UpdateHooks,
    ) -> AttachOutcome
    where
        F: FnOnce(&Store) -> Option<StateSelectors>,
    {
        if let Some(add_dep) = &self.inner.hooks.add_dep {
            add_dep(component.as_ref(), kind);
        }

        let Some(selectors) = declare(self) else {
            tracing::debug!(?kind, "component declares no global state");
            return AttachOutcome::NoDependency;
        };
        if selectors.is_empty() {
            tracing::warn!(?kind, "state declaration has no selectors, component not tracked");
            return AttachOutcome::Rejected;
        }

        let snapshot = self.state();
        let derived = selectors.evaluate(&snapshot);
        let keys = derived.len();
        component.push_derived_state(&namespaced(&self.namespace(), &derived));

        let record = Arc::new(DependencyRecord::new(component, kind, selectors, hooks, derived));
        if self.inner.deps.insert(component, record.clone()) {
            tracing::debug!(?kind, "component attached again, previous record replaced");
        }

        // A dispatch that swapped state before the insert did not see this
        // record. Later dispatches will.
        let latest = self.state();
        if !latest.ptr_eq(&snapshot) {
            let namespace = self.namespace();
            Propagator::new(&namespace).update(std::slice::from_ref(&record), &latest);
            tracing::debug!(?kind, "state changed during attach, caught up");
        }

        tracing::debug!(?kind, keys, "component attached");
        AttachOutcome::Subscribed
    }

    /// Host extension point: a component was detached.
    ///
    /// Safe to call at any time, including long after the component was
    /// dropped, and more than once. Returns `true` if a record was removed.
    pub fn detach(&self, component: &Arc<dyn ViewBinding>) -> bool {
        let removed = self.inner.deps.remove(component);
        if removed {
            tracing::debug!("component detached");
        }
        removed
    }

    /// Number of dependency records, including ones whose component was
    /// dropped but not yet pruned.
    pub fn dependent_count(&self) -> usize {
        self.inner.deps.len()
    }

    /// Whether `component` has an active dependency record.
    pub fn is_attached(&self, component: &Arc<dyn ViewBinding>) -> bool {
        self.inner.deps.contains(component)
    }

    // ------------------------------------------------------------------------
    // State and configuration
    // ------------------------------------------------------------------------

    /// The current state snapshot.
    pub fn state(&self) -> StateTree {
        self.inner.state.read().clone()
    }

    /// The key derived state is written under.
    pub fn namespace(&self) -> String {
        self.inner.namespace.read().clone()
    }

    /// Change the namespace for this store. Affects later pushes only.
    pub fn set_namespace(&self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if namespace.is_empty() {
            tracing::warn!("ignoring empty namespace");
            return;
        }
        *self.inner.namespace.write() = namespace;
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("namespace", &self.namespace())
            .field("reducers", &self.reducer_count())
            .field("middleware", &self.middleware_count())
            .field("dependents", &self.dependent_count())
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}

/// Builder for [`Store`].
#[derive(Debug, Default)]
pub struct StoreBuilder {
    config: StoreConfig,
    hooks: StoreHooks,
}

impl StoreBuilder {
    /// Use `config` in place of the defaults.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Install store-level hooks.
    pub fn hooks(mut self, hooks: StoreHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Create the store. An empty namespace falls back to
    /// [`DEFAULT_NAMESPACE`].
    pub fn build(self) -> Store {
        let mut namespace = self.config.namespace;
        if namespace.is_empty() {
            tracing::warn!("empty namespace configured, using \"{DEFAULT_NAMESPACE}\"");
            namespace = DEFAULT_NAMESPACE.to_owned();
        }

        Store {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StateTree::new()),
                reducers: RwLock::new(ReducerRegistry::new()),
                middleware: MiddlewareChain::new(),
                deps: DependencyTracker::new(),
                dispatching: AtomicBool::new(false),
                namespace: RwLock::new(namespace),
                hooks: self.hooks,
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

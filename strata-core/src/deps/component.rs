//! Component-facing types.
//!
//! The store never owns components. The host's lifecycle system creates and
//! destroys them and hands the store an `Arc<dyn ViewBinding>` at attach
//! time; the store keeps only a weak reference.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::diff::Patch;
use crate::error::HandlerError;
use crate::state::{StateMap, StateTree};

/// The host's data-binding boundary for one component.
pub trait ViewBinding: Send + Sync {
    /// Write derived state into the component's bound view state.
    ///
    /// `data` has a single key, the store's namespace, mapping to the
    /// component's full derived state.
    fn push_derived_state(&self, data: &StateMap);
}

/// Whether a dependent is a page or a plain component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// A top-level page.
    Page,
    /// Any component nested inside a page.
    #[default]
    Component,
}

impl ComponentKind {
    /// Whether this is [`ComponentKind::Page`].
    pub fn is_page(self) -> bool {
        self == ComponentKind::Page
    }
}

/// Reads one value out of the global state.
pub type Selector = Arc<dyn Fn(&StateTree) -> Value + Send + Sync>;

/// The selectors a component declares, keyed by local name.
///
/// Applying every selector to a state tree produces the component's derived
/// state.
///
/// # Example
///
/// ```rust,ignore
/// let selectors = StateSelectors::new()
///     .select("name", |state| state.value("name"))
///     .select("count", |state| state.value("items").as_array().map_or(0, Vec::len).into());
/// ```
#[derive(Clone, Default)]
pub struct StateSelectors {
    selectors: IndexMap<String, Selector>,
}

impl StateSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a selector under `name`, replacing any previous one.
    pub fn select<F>(mut self, name: impl Into<String>, selector: F) -> Self
    where
        F: Fn(&StateTree) -> Value + Send + Sync + 'static,
    {
        self.selectors.insert(name.into(), Arc::new(selector));
        self
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Apply every selector to `state`.
    pub fn evaluate(&self, state: &StateTree) -> StateMap {
        self.selectors
            .iter()
            .map(|(name, selector)| (name.clone(), selector(state)))
            .collect()
    }
}

impl fmt::Debug for StateSelectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.selectors.keys()).finish()
    }
}

/// Called before derived state is pushed. `Ok(false)` vetoes the update.
pub type WillUpdate =
    Arc<dyn Fn(&dyn ViewBinding, &StateMap) -> Result<bool, HandlerError> + Send + Sync>;

/// Called after derived state is pushed, with the patches that were applied.
pub type DidUpdate =
    Arc<dyn Fn(&dyn ViewBinding, &StateMap, &[Patch]) -> Result<(), HandlerError> + Send + Sync>;

/// Optional per-component update hooks.
#[derive(Clone, Default)]
pub struct UpdateHooks {
    pub(crate) will_update: Option<WillUpdate>,
    pub(crate) did_update: Option<DidUpdate>,
}

impl UpdateHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn will_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn ViewBinding, &StateMap) -> Result<bool, HandlerError> + Send + Sync + 'static,
    {
        self.will_update = Some(Arc::new(hook));
        self
    }

    pub fn did_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn ViewBinding, &StateMap, &[Patch]) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.did_update = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for UpdateHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateHooks")
            .field("will_update", &self.will_update.is_some())
            .field("did_update", &self.did_update.is_some())
            .finish()
    }
}

/// Wrap derived state under the namespace key.
pub(crate) fn namespaced(namespace: &str, derived: &StateMap) -> StateMap {
    let mut data = StateMap::new();
    data.insert(namespace.to_owned(), Value::Object(derived.clone()));
    data
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selectors_evaluate_in_declaration_order() {
        let state = StateTree::from(json!({ "a": 1, "b": 2 }).as_object().unwrap().clone());
        let selectors = StateSelectors::new()
            .select("second", |s| s.value("b"))
            .select("first", |s| s.value("a"))
            .select("missing", |s| s.value("zzz"));

        let derived = selectors.evaluate(&state);
        assert_eq!(
            derived.keys().collect::<Vec<_>>(),
            vec!["second", "first", "missing"]
        );
        assert_eq!(derived["missing"], Value::Null);
    }

    #[test]
    fn namespaced_wraps_derived_state() {
        let derived = json!({ "name": "tao" }).as_object().unwrap().clone();
        let data = namespaced("global", &derived);
        assert_eq!(Value::Object(data), json!({ "global": { "name": "tao" } }));
    }

    #[test]
    fn kind_defaults_to_component() {
        assert_eq!(ComponentKind::default(), ComponentKind::Component);
        assert!(ComponentKind::Page.is_page());
    }
}

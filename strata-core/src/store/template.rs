//! Component Templates
//!
//! The host integration layer. A host describes each kind of page or
//! component once, as a [`ComponentDefinition`], and registers it with
//! [`Store::define_component`]. The resulting [`ComponentTemplate`] is then
//! used from the host's own lifecycle callbacks: call `attach` when an
//! instance is attached and `detach` when it is torn down.
//!
//! Defining a component may also register reducers owned by that component
//! type. That callback runs exactly once, at definition time, no matter how
//! many instances are attached later.

use std::fmt;
use std::sync::Arc;

use super::Store;
use crate::deps::{namespaced, AttachOutcome, ComponentKind, StateSelectors, UpdateHooks, ViewBinding};
use crate::error::Result;
use crate::state::StateMap;

/// Produces a component's selectors. `None` declares no dependency.
pub type StateDeclaration = Arc<dyn Fn(&Store) -> Option<StateSelectors> + Send + Sync>;

type DefineReducer = Box<dyn FnOnce(&Store) -> Result<()> + Send>;

/// Everything a host knows about a page or component type.
pub struct ComponentDefinition {
    kind: ComponentKind,
    define_reducer: Option<DefineReducer>,
    declaration: Option<StateDeclaration>,
    hooks: UpdateHooks,
}

impl ComponentDefinition {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            define_reducer: None,
            declaration: None,
            hooks: UpdateHooks::default(),
        }
    }

    pub fn page() -> Self {
        Self::new(ComponentKind::Page)
    }

    pub fn component() -> Self {
        Self::new(ComponentKind::Component)
    }

    /// Register reducers owned by this component type.
    pub fn define_reducer<F>(mut self, define: F) -> Self
    where
        F: FnOnce(&Store) -> Result<()> + Send + 'static,
    {
        self.define_reducer = Some(Box::new(define));
        self
    }

    /// Declare the global state this component type selects.
    pub fn global_state<F>(mut self, declare: F) -> Self
    where
        F: Fn(&Store) -> Option<StateSelectors> + Send + Sync + 'static,
    {
        self.declaration = Some(Arc::new(declare));
        self
    }

    pub fn hooks(mut self, hooks: UpdateHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("kind", &self.kind)
            .field("define_reducer", &self.define_reducer.is_some())
            .field("declaration", &self.declaration.is_some())
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// A defined component type, ready to attach instances.
#[derive(Clone)]
pub struct ComponentTemplate {
    kind: ComponentKind,
    declaration: Option<StateDeclaration>,
    hooks: UpdateHooks,
    namespace: String,
}

impl ComponentTemplate {
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Whether instances will select any global state.
    pub fn declares_state(&self) -> bool {
        self.declaration.is_some()
    }

    /// Placeholder data the host seeds into each instance before attach, so
    /// views can bind against the namespace key from the first render.
    ///
    /// Empty for templates that declare no state.
    pub fn initial_data(&self) -> StateMap {
        if self.declares_state() {
            namespaced(&self.namespace, &StateMap::new())
        } else {
            StateMap::new()
        }
    }

    /// Call from the host's attach (or page load) callback.
    pub fn attach(&self, store: &Store, component: &Arc<dyn ViewBinding>) -> AttachOutcome {
        let declaration = self.declaration.clone();
        store.attach(
            component,
            self.kind,
            move |store| declaration.and_then(|declare| declare(store)),
            self.hooks.clone(),
        )
    }

    /// Call from the host's detach (or page unload) callback.
    pub fn detach(&self, store: &Store, component: &Arc<dyn ViewBinding>) -> bool {
        store.detach(component)
    }
}

impl fmt::Debug for ComponentTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTemplate")
            .field("kind", &self.kind)
            .field("declaration", &self.declaration.is_some())
            .field("hooks", &self.hooks)
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl Store {
    /// Register a component type.
    ///
    /// Runs the definition's reducer callback once; its errors are returned
    /// as-is.
    pub fn define_component(&self, definition: ComponentDefinition) -> Result<ComponentTemplate> {
        if let Some(define) = definition.define_reducer {
            define(self)?;
        }

        Ok(ComponentTemplate {
            kind: definition.kind,
            declaration: definition.declaration,
            hooks: definition.hooks,
            namespace: self.namespace(),
        })
    }
}

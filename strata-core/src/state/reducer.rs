//! Reducer Registry
//!
//! A reducer is a named state transition. It contributes an initial slice of
//! state when registered and computes a partial update for every dispatch of
//! its action.
//!
//! Registration is validated up front: the action name must be unique, and
//! every key a reducer contributes must be new to the state tree. Two
//! reducers can therefore never silently shadow each other's keys.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::tree::{StateMap, StateTree};
use crate::error::{json_type_name, ConfigurationError, HandlerError};

/// Computes a partial state update from the current state and a payload.
pub type Setter =
    Arc<dyn Fn(&StateTree, Value) -> Result<StateMap, HandlerError> + Send + Sync>;

/// The user-facing description of a reducer, handed to `Store::register`.
///
/// # Example
///
/// ```rust,ignore
/// let descriptor = ReducerDescriptor::new()
///     .partial_state(json!({ "name": "tao" }))
///     .setter(|_state, payload| {
///         let mut update = StateMap::new();
///         update.insert("name".into(), payload);
///         Ok(update)
///     });
/// ```
#[derive(Clone, Default)]
pub struct ReducerDescriptor {
    partial_state: Option<Value>,
    setter: Option<Setter>,
}

impl ReducerDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state this reducer contributes.
    ///
    /// Must be a JSON object; anything else is rejected at registration.
    pub fn partial_state(mut self, partial_state: impl Into<Value>) -> Self {
        self.partial_state = Some(partial_state.into());
        self
    }

    /// The function computing an update for each dispatch.
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&StateTree, Value) -> Result<StateMap, HandlerError> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Whether a setter was given. Without one, dispatches change nothing.
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }
}

impl fmt::Debug for ReducerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerDescriptor")
            .field("partial_state", &self.partial_state)
            .field("has_setter", &self.has_setter())
            .finish()
    }
}

/// A validated, registered reducer.
pub struct Reducer {
    action: String,
    setter: Setter,
}

impl Reducer {
    /// The action this reducer handles.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Run the setter against a state snapshot.
    pub fn apply(&self, state: &StateTree, payload: Value) -> Result<StateMap, HandlerError> {
        (self.setter)(state, payload)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer").field("action", &self.action).finish()
    }
}

/// Setter installed when a reducer is registered without one.
fn missing_setter(action: &str) -> Setter {
    let action = action.to_owned();
    Arc::new(move |_state: &StateTree, _payload: Value| -> Result<StateMap, HandlerError> {
        tracing::warn!(
            action = %action,
            "can't set \"{}\" value, no setter was defined",
            action
        );
        Ok(StateMap::new())
    })
}

/// Ordered collection of registered reducers, keyed by action name.
#[derive(Debug, Default)]
pub struct ReducerRegistry {
    reducers: IndexMap<String, Arc<Reducer>>,
}

impl ReducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a reducer.
    ///
    /// `state` is the live state tree the contribution will be merged into.
    /// On success, returns the contribution for the caller to merge. The
    /// registry is untouched when validation fails.
    pub fn register(
        &mut self,
        state: &StateTree,
        action: &str,
        descriptor: ReducerDescriptor,
    ) -> Result<StateMap, ConfigurationError> {
        if action.is_empty() {
            return Err(ConfigurationError::EmptyAction);
        }
        if self.reducers.contains_key(action) {
            return Err(ConfigurationError::DuplicateAction {
                action: action.to_owned(),
            });
        }

        let contribution = match descriptor.partial_state {
            None => StateMap::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ConfigurationError::MalformedPartialState {
                    action: action.to_owned(),
                    found: json_type_name(&other),
                })
            }
        };

        if let Some(key) = contribution.keys().find(|key| state.contains_key(key)) {
            return Err(ConfigurationError::DuplicateKey {
                action: action.to_owned(),
                key: key.clone(),
            });
        }

        let setter = descriptor
            .setter
            .unwrap_or_else(|| missing_setter(action));

        self.reducers.insert(
            action.to_owned(),
            Arc::new(Reducer {
                action: action.to_owned(),
                setter,
            }),
        );

        Ok(contribution)
    }

    /// Look up the reducer for an action.
    pub fn get(&self, action: &str) -> Option<Arc<Reducer>> {
        self.reducers.get(action).cloned()
    }

    /// Whether `action` is registered.
    pub fn contains(&self, action: &str) -> bool {
        self.reducers.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_returns_contribution() {
        let mut registry = ReducerRegistry::new();
        let contribution = registry
            .register(
                &StateTree::new(),
                "rename",
                ReducerDescriptor::new().partial_state(json!({ "name": "tao" })),
            )
            .unwrap();

        assert_eq!(contribution.get("name"), Some(&json!("tao")));
        assert!(registry.contains("rename"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_duplicate_action() {
        let mut registry = ReducerRegistry::new();
        let state = StateTree::new();
        registry
            .register(&state, "a", ReducerDescriptor::new())
            .unwrap();

        let err = registry
            .register(&state, "a", ReducerDescriptor::new())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateAction {
                action: "a".into()
            }
        );
    }

    #[test]
    fn rejects_key_already_in_state() {
        let mut registry = ReducerRegistry::new();
        let state = StateTree::new();
        let first = registry
            .register(
                &state,
                "a",
                ReducerDescriptor::new().partial_state(json!({ "name": 1 })),
            )
            .unwrap();
        let state = state.merge(first);

        let err = registry
            .register(
                &state,
                "b",
                ReducerDescriptor::new().partial_state(json!({ "age": 2, "name": 3 })),
            )
            .unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::DuplicateKey {
                action: "b".into(),
                key: "name".into()
            }
        );
        // Failed registration leaves nothing behind.
        assert!(!registry.contains("b"));
    }

    #[test]
    fn rejects_non_object_partial_state() {
        let mut registry = ReducerRegistry::new();
        let err = registry
            .register(
                &StateTree::new(),
                "a",
                ReducerDescriptor::new().partial_state(json!([1, 2])),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigurationError::MalformedPartialState { found: "array", .. }
        ));
    }

    #[test]
    fn rejects_empty_action() {
        let mut registry = ReducerRegistry::new();
        let err = registry
            .register(&StateTree::new(), "", ReducerDescriptor::new())
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyAction);
    }

    #[test]
    fn missing_setter_is_a_no_op() {
        let mut registry = ReducerRegistry::new();
        registry
            .register(&StateTree::new(), "noop", ReducerDescriptor::new())
            .unwrap();

        let reducer = registry.get("noop").unwrap();
        let update = reducer.apply(&StateTree::new(), json!(1)).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn setter_receives_state_and_payload() {
        let mut registry = ReducerRegistry::new();
        registry
            .register(
                &StateTree::new(),
                "add",
                ReducerDescriptor::new()
                    .partial_state(json!({ "count": 1 }))
                    .setter(|state, payload| {
                        let current = state.value("count").as_i64().unwrap_or(0);
                        let step = payload.as_i64().unwrap_or(0);
                        let mut update = StateMap::new();
                        update.insert("count".into(), json!(current + step));
                        Ok(update)
                    }),
            )
            .unwrap();

        let state = StateTree::new().merge(json!({ "count": 1 }).as_object().unwrap().clone());
        let update = registry.get("add").unwrap().apply(&state, json!(4)).unwrap();
        assert_eq!(update.get("count"), Some(&json!(5)));
    }
}

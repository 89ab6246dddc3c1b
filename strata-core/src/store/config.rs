//! Store configuration and store-level hooks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deps::{ComponentKind, ViewBinding};
use crate::error::HandlerError;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "global";

/// Static configuration for a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key under which derived state is written into a component's view.
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

impl StoreConfig {
    /// Parse configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Receives handler and setter failures: `(action, payload, error)`.
pub type ErrorHook = Arc<dyn Fn(&str, &Value, &HandlerError) + Send + Sync>;

/// Called every time a component attaches, before its declaration runs.
pub type AddDepHook = Arc<dyn Fn(&dyn ViewBinding, ComponentKind) + Send + Sync>;

/// Optional store-level hooks.
#[derive(Clone, Default)]
pub struct StoreHooks {
    pub(crate) middleware_error: Option<ErrorHook>,
    pub(crate) add_dep: Option<AddDepHook>,
}

impl StoreHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route dispatch failures here instead of logging a warning.
    pub fn on_middleware_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &Value, &HandlerError) + Send + Sync + 'static,
    {
        self.middleware_error = Some(Arc::new(hook));
        self
    }

    pub fn on_add_dep<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn ViewBinding, ComponentKind) + Send + Sync + 'static,
    {
        self.add_dep = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for StoreHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHooks")
            .field("middleware_error", &self.middleware_error.is_some())
            .field("add_dep", &self.add_dep.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_namespace_is_global() {
        assert_eq!(StoreConfig::default().namespace, "global");
    }

    #[test]
    fn parses_namespace_from_json() {
        let config = StoreConfig::from_json(r#"{ "namespace": "shared" }"#).unwrap();
        assert_eq!(config.namespace, "shared");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = StoreConfig::from_json("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(StoreConfig::from_json(r#"{ "namespace": 3 }"#).is_err());
    }
}

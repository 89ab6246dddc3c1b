//! Strata Core
//!
//! This crate provides a global state store for component-based UI hosts.
//! It implements:
//!
//! - A single state tree, changed only by dispatching named actions
//! - Reducers that own disjoint slices of that tree
//! - A middleware chain that can inspect, rewrite or stop a dispatch
//! - Dependency tracking that pushes derived state to attached components,
//!   along with the structural patches that describe each change
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `state`: The state tree and reducer registry
//! - `middleware`: The handler chain wrapped around dispatch
//! - `diff`: Structural diffing and patch paths
//! - `deps`: Selectors, dependency records and the propagator
//! - `store`: The store itself, its configuration and component templates
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::{ReducerDescriptor, StateMap, StateSelectors, Store, UpdateHooks};
//! use serde_json::json;
//!
//! let store = Store::new();
//! store.register(
//!     "rename",
//!     ReducerDescriptor::new()
//!         .partial_state(json!({ "name": "tao" }))
//!         .setter(|_state, payload| {
//!             let mut update = StateMap::new();
//!             update.insert("name".into(), payload);
//!             Ok(update)
//!         }),
//! )?;
//!
//! // `view` is the host's component, implementing `ViewBinding`.
//! store.attach(
//!     &view,
//!     ComponentKind::Component,
//!     |_store| Some(StateSelectors::new().select("name", |s| s.value("name"))),
//!     UpdateHooks::new(),
//! );
//!
//! store.dispatch("rename", "taotao")?;
//! // The view now holds { "global": { "name": "taotao" } }
//! ```

pub mod deps;
pub mod diff;
pub mod error;
pub mod middleware;
pub mod state;
pub mod store;

pub use deps::{AttachOutcome, ComponentKind, StateSelectors, UpdateHooks, ViewBinding};
pub use diff::{Patch, PatchKind, PatchPath};
pub use error::{ConfigurationError, HandlerError, Result, StoreError};
pub use middleware::{MiddlewareHandle, Next};
pub use state::{ReducerDescriptor, StateMap, StateTree};
pub use store::{ComponentDefinition, ComponentTemplate, Store, StoreBuilder, StoreConfig, StoreHooks};

//! Middleware
//!
//! Interceptors that run around every dispatch. Handlers can observe an
//! action, rewrite its payload, or stop it before the reducer runs.
//!
//! # Concepts
//!
//! ## Handlers
//!
//! A handler is a function of the payload and a [`Next`] continuation.
//! Calling `next.run(payload)` continues the chain. Not calling it ends the
//! dispatch without changing state.
//!
//! ## Handles
//!
//! Registering a handler returns a [`MiddlewareHandle`]. Calling `remove` on
//! it unregisters exactly that handler; calling it again does nothing.

mod chain;

pub use chain::{Handler, Matcher, MiddlewareChain, MiddlewareHandle, MiddlewareId, Next, Terminal};

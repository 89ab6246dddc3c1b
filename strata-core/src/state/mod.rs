//! State
//!
//! The state tree and the reducers that are allowed to change it.
//!
//! State is only ever changed by dispatching a named action. Each action has
//! exactly one reducer, whose setter returns a partial mapping that is merged
//! over the current tree to produce the next snapshot.

mod reducer;
mod tree;

pub use reducer::{Reducer, ReducerDescriptor, ReducerRegistry, Setter};
pub use tree::{StateMap, StateTree};

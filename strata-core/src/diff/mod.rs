//! Diff and Patch
//!
//! Structural comparison of derived state. The propagator uses this to work
//! out which sub-paths of a component's derived state changed after a
//! dispatch, so hooks see a minimal patch set instead of the whole slice.

mod patch;
mod structural;

pub use patch::{Patch, PatchKind, PatchPath, PathSegment};
pub use structural::diff;

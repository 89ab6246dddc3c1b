//! Patch Types
//!
//! A patch records one change between two derived-state mappings: where it
//! happened, what kind of change it was, and the values on either side.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use smallvec::SmallVec;

/// One step in a patch path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

/// Address of a changed value inside a derived-state mapping.
///
/// Rendered as a dotted path with bracketed indexes, e.g. `user.tags[2]`.
/// Most paths are only a few segments deep, so segments are stored inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PatchPath {
    segments: SmallVec<[PathSegment; 4]>,
}

impl PatchPath {
    /// The empty path, addressing the mapping itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to `key` under this one.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.to_owned()));
        Self { segments }
    }

    /// Path to array element `index` under this one.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Segments from the outermost key inward.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether this is the empty path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if position == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for PatchPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What happened at a patch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    /// The path did not exist before.
    Add,
    /// The path exists on both sides with different values.
    Replace,
    /// The path no longer exists.
    Remove,
}

/// A single difference between previous and next derived state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub path: PatchPath,
    #[serde(rename = "type")]
    pub kind: PatchKind,
    /// New value, absent for removals.
    pub value: Option<Value>,
    /// Old value, absent for additions.
    pub previous_value: Option<Value>,
}

impl Patch {
    /// `value` now exists at `path`.
    pub fn add(path: PatchPath, value: Value) -> Self {
        Self {
            path,
            kind: PatchKind::Add,
            value: Some(value),
            previous_value: None,
        }
    }

    /// The value at `path` changed from `previous_value` to `value`.
    pub fn replace(path: PatchPath, value: Value, previous_value: Value) -> Self {
        Self {
            path,
            kind: PatchKind::Replace,
            value: Some(value),
            previous_value: Some(previous_value),
        }
    }

    /// `previous_value` no longer exists at `path`.
    pub fn remove(path: PatchPath, previous_value: Value) -> Self {
        Self {
            path,
            kind: PatchKind::Remove,
            value: None,
            previous_value: Some(previous_value),
        }
    }

    /// The path as seen from the component's bound view, where derived
    /// state lives under `namespace`.
    pub fn namespaced_path(&self, namespace: &str) -> String {
        if self.path.is_root() {
            namespace.to_owned()
        } else if let Some(PathSegment::Index(_)) = self.path.segments().first() {
            format!("{namespace}{}", self.path)
        } else {
            format!("{namespace}.{}", self.path)
        }
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
    fn path_renders_keys_and_indexes() {
        let path = PatchPath::root().key("user").key("tags").index(2);
        assert_eq!(path.to_string(), "user.tags[2]");
        assert_eq!(PatchPath::root().to_string(), "");
    }

    #[test]
    fn namespaced_path_prefixes_namespace() {
        let patch = Patch::replace(PatchPath::root().key("name"), json!("b"), json!("a"));
        assert_eq!(patch.namespaced_path("global"), "global.name");
    }

    #[test]
    fn patch_serializes_for_hosts() {
        let patch = Patch::replace(PatchPath::root().key("name"), json!("taotao"), json!("tao"));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({
                "path": "name",
                "type": "replace",
                "value": "taotao",
                "previousValue": "tao",
            })
        );
    }
}

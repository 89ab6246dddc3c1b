//! Structural Diff
//!
//! Walks two mappings side by side and emits a patch for every sub-path
//! whose value differs. Equal subtrees are skipped as soon as they compare
//! equal, so unchanged branches cost one comparison each.
//!
//! # Algorithm
//!
//! 1. Keys present in `next`, in `next`'s order: missing before means `Add`,
//!    otherwise compare the two values.
//! 2. Keys present only in `previous`: `Remove`.
//! 3. Two objects recurse by key. Two arrays recurse element by element
//!    over their common length, then add the tail of a longer `next` or
//!    remove the tail of a longer `previous` (highest index first, so the
//!    removals can be applied in order).
//! 4. Anything else that differs is a `Replace` of the whole value.

use serde_json::Value;

use super::patch::{Patch, PatchPath};
use crate::state::StateMap;

/// Compute the minimal patch list turning `previous` into `next`.
pub fn diff(previous: &StateMap, next: &StateMap) -> Vec<Patch> {
    let mut patches = Vec::new();
    diff_maps(&PatchPath::root(), previous, next, &mut patches);
    patches
}

fn diff_maps(path: &PatchPath, previous: &StateMap, next: &StateMap, out: &mut Vec<Patch>) {
    for (key, value) in next {
        let child = path.key(key);
        match previous.get(key) {
            Some(old) => diff_values(child, old, value, out),
            None => out.push(Patch::add(child, value.clone())),
        }
    }

    for (key, old) in previous {
        if !next.contains_key(key) {
            out.push(Patch::remove(path.key(key), old.clone()));
        }
    }
}

fn diff_values(path: PatchPath, previous: &Value, next: &Value, out: &mut Vec<Patch>) {
    if previous == next {
        return;
    }

    match (previous, next) {
        (Value::Object(old), Value::Object(new)) => diff_maps(&path, old, new, out),
        (Value::Array(old), Value::Array(new)) => diff_arrays(&path, old, new, out),
        _ => out.push(Patch::replace(path, next.clone(), previous.clone())),
    }
}

fn diff_arrays(path: &PatchPath, previous: &[Value], next: &[Value], out: &mut Vec<Patch>) {
    let common = previous.len().min(next.len());

    for (index, (old, new)) in previous.iter().zip(next).enumerate() {
        diff_values(path.index(index), old, new, out);
    }

    for (index, value) in next.iter().enumerate().skip(common) {
        out.push(Patch::add(path.index(index), value.clone()));
    }

    for (index, old) in previous.iter().enumerate().skip(common).rev() {
        out.push(Patch::remove(path.index(index), old.clone()));
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::PatchKind;
    use serde_json::json;

    fn map(value: Value) -> StateMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn paths(patches: &[Patch]) -> Vec<String> {
        patches.iter().map(|p| p.path.to_string()).collect()
    }

    #[test]
    fn equal_maps_produce_no_patches() {
        let state = map(json!({ "a": 1, "b": { "c": [1, 2, 3] } }));
        assert!(diff(&state, &state.clone()).is_empty());
    }

    #[test]
    fn scalar_change_is_a_replace() {
        let patches = diff(&map(json!({ "name": "tao" })), &map(json!({ "name": "taotao" })));

        assert_eq!(
            patches,
            vec![Patch::replace(
                PatchPath::root().key("name"),
                json!("taotao"),
                json!("tao")
            )]
        );
    }

    #[test]
    fn nested_objects_only_report_changed_leaves() {
        let before = map(json!({ "user": { "name": "a", "age": 1, "city": "x" } }));
        let after = map(json!({ "user": { "name": "a", "age": 2, "zip": "9" } }));

        let patches = diff(&before, &after);
        assert_eq!(paths(&patches), vec!["user.age", "user.zip", "user.city"]);
        assert_eq!(patches[0].kind, PatchKind::Replace);
        assert_eq!(patches[1].kind, PatchKind::Add);
        assert_eq!(patches[2].kind, PatchKind::Remove);
        assert_eq!(patches[2].previous_value, Some(json!("x")));
        assert_eq!(patches[2].value, None);
    }

    #[test]
    fn top_level_add_and_remove() {
        let patches = diff(&map(json!({ "a": 1 })), &map(json!({ "b": 2 })));
        assert_eq!(paths(&patches), vec!["b", "a"]);
        assert_eq!(patches[0].kind, PatchKind::Add);
        assert_eq!(patches[1].kind, PatchKind::Remove);
    }

    #[test]
    fn arrays_diff_by_index() {
        let patches = diff(
            &map(json!({ "list": [1, 2, 3] })),
            &map(json!({ "list": [1, 5, 3, 4] })),
        );
        assert_eq!(paths(&patches), vec!["list[1]", "list[3]"]);
        assert_eq!(patches[0].kind, PatchKind::Replace);
        assert_eq!(patches[1].kind, PatchKind::Add);
    }

    #[test]
    fn shrinking_array_removes_from_the_end() {
        let patches = diff(&map(json!({ "list": [1, 2, 3] })), &map(json!({ "list": [1] })));
        assert_eq!(paths(&patches), vec!["list[2]", "list[1]"]);
        assert!(patches.iter().all(|p| p.kind == PatchKind::Remove));
    }

    #[test]
    fn type_change_replaces_whole_value() {
        let patches = diff(
            &map(json!({ "a": { "b": 1 } })),
            &map(json!({ "a": [1] })),
        );
        assert_eq!(
            patches,
            vec![Patch::replace(
                PatchPath::root().key("a"),
                json!([1]),
                json!({ "b": 1 })
            )]
        );
    }

    #[test]
    fn null_to_value_is_a_replace() {
        let patches = diff(&map(json!({ "a": null })), &map(json!({ "a": 0 })));
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].kind, PatchKind::Replace);
    }
}

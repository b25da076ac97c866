use serde_json::Value;

use crate::types::Tree;

/// Deep-merge `overlay` on top of `base`.
///
/// If both sides hold a map for the same key, recurse. Otherwise `overlay`'s
/// value wins, so sequences are replaced wholesale and never concatenated.
/// Keys keep their position in `base`; new keys are appended in `overlay` order.
pub fn deep_merge(mut base: Tree, overlay: Tree) -> Tree {
    merge_into(&mut base, overlay);
    base
}

fn merge_into(base: &mut Tree, overlay: Tree) {
    for (key, overlay_val) in overlay {
        match base.get_mut(&key) {
            Some(Value::Object(base_map)) if overlay_val.is_object() => {
                if let Value::Object(overlay_map) = overlay_val {
                    merge_into(base_map, overlay_map);
                }
            }
            Some(slot) => *slot = overlay_val,
            None => {
                base.insert(key, overlay_val);
            }
        }
    }
}

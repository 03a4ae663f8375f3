//! Recursive overlay of JSON documents.

use serde_json::Value as JsonValue;

/// Overlays `overlay` onto `base` in place.
///
/// Objects are merged key by key, recursively. Arrays and scalars in the
/// overlay replace the base value. A `null` in the overlay leaves the base
/// value untouched, so partially filled documents never erase defaults.
pub fn deep_merge(base: &mut JsonValue, overlay: JsonValue) {
    match (base, overlay) {
        (_, JsonValue::Null) => {}
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None if value.is_null() => {}
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_merge() {
        let mut base = json!({"theme": {"primary": "#000", "font": "Inter"}, "name": "Loja"});
        deep_merge(&mut base, json!({"theme": {"primary": "#f0f"}}));
        assert_eq!(base, json!({"theme": {"primary": "#f0f", "font": "Inter"}, "name": "Loja"}));
    }

    #[test]
    fn test_arrays_and_scalars_replace() {
        let mut base = json!({"banners": ["a", "b"], "count": 1});
        deep_merge(&mut base, json!({"banners": ["c"], "count": 2}));
        assert_eq!(base, json!({"banners": ["c"], "count": 2}));
    }

    #[test]
    fn test_null_keeps_base() {
        let mut base = json!({"logo": "logo.png", "nested": {"a": 1}});
        deep_merge(&mut base, json!({"logo": null, "nested": null, "extra": null}));
        assert_eq!(base, json!({"logo": "logo.png", "nested": {"a": 1}}));
    }

    #[test]
    fn test_new_keys_added() {
        let mut base = json!({});
        deep_merge(&mut base, json!({"a": {"b": 1}}));
        assert_eq!(base, json!({"a": {"b": 1}}));
    }
}

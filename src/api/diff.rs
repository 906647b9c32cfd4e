//! Field-wise diff between two payload values
//!
//! The diff walks the serialized forms of two payloads and reports every
//! leaf that differs, excluding paths classified as output-only or
//! system. The result drives both the per-kind plan decision and the
//! kind-specific update dispatch.

use serde_json::Value;

use super::traits::{FieldKind, FieldPath, FieldTraits};

/// One differing field. `a` is the current (got) value, `b` the wanted
/// value. A value of `Null` means the field is absent on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffItem {
    pub path: FieldPath,
    pub a: Value,
    pub b: Value,
}

/// Result of comparing two payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    pub items: Vec<DiffItem>,
}

impl DiffResult {
    pub fn has_diff(&self) -> bool {
        !self.items.is_empty()
    }

    /// Paths of all differing fields.
    pub fn paths(&self) -> Vec<&FieldPath> {
        self.items.iter().map(|item| &item.path).collect()
    }

    /// Find the item for an exact path, if any.
    pub fn item_at(&self, path: &FieldPath) -> Option<&DiffItem> {
        self.items.iter().find(|item| &item.path == path)
    }
}

/// Compare two serialized payloads field by field.
pub fn diff_values(a: &Value, b: &Value, traits: &FieldTraits) -> DiffResult {
    let mut result = DiffResult::default();
    walk(a, b, FieldPath::new(), traits, &mut result);
    result
}

fn walk(a: &Value, b: &Value, path: FieldPath, traits: &FieldTraits, out: &mut DiffResult) {
    if traits.classify(&path) != FieldKind::Normal {
        return;
    }

    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let mut keys: Vec<&String> = ma.keys().chain(mb.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let va = ma.get(key).unwrap_or(&Value::Null);
                let vb = mb.get(key).unwrap_or(&Value::Null);
                walk(va, vb, path.clone().field(key), traits, out);
            }
        }
        (Value::Array(la), Value::Array(lb)) => {
            if la.len() != lb.len() {
                // Length change is reported as a single item for the
                // whole list rather than per-element noise.
                out.items.push(DiffItem {
                    path,
                    a: a.clone(),
                    b: b.clone(),
                });
                return;
            }
            for (idx, (va, vb)) in la.iter().zip(lb).enumerate() {
                walk(va, vb, path.clone().index(idx), traits, out);
            }
        }
        _ => {
            if a != b {
                out.items.push(DiffItem {
                    path,
                    a: a.clone(),
                    b: b.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_diff_on_equal_values() {
        let v = json!({"name": "a", "port": 80});
        assert!(!diff_values(&v, &v, &FieldTraits::new()).has_diff());
    }

    #[test]
    fn test_scalar_diff_reports_path_and_values() {
        let a = json!({"description": "old"});
        let b = json!({"description": "new"});
        let diff = diff_values(&a, &b, &FieldTraits::new());
        assert_eq!(diff.items.len(), 1);
        let item = &diff.items[0];
        assert_eq!(item.path.to_string(), "description");
        assert_eq!(item.a, json!("old"));
        assert_eq!(item.b, json!("new"));
    }

    #[test]
    fn test_missing_field_diffs_against_null() {
        let a = json!({});
        let b = json!({"target": "t"});
        let diff = diff_values(&a, &b, &FieldTraits::new());
        assert_eq!(diff.items.len(), 1);
        assert_eq!(diff.items[0].a, Value::Null);
    }

    #[test]
    fn test_nested_and_indexed_paths() {
        let a = json!({"backends": [{"group": "g1"}, {"group": "g2"}]});
        let b = json!({"backends": [{"group": "g1"}, {"group": "g3"}]});
        let diff = diff_values(&a, &b, &FieldTraits::new());
        assert_eq!(diff.items.len(), 1);
        assert_eq!(diff.items[0].path.to_string(), "backends[1].group");
    }

    #[test]
    fn test_list_length_change_is_one_item() {
        let a = json!({"healthChecks": ["hc1"]});
        let b = json!({"healthChecks": ["hc1", "hc2"]});
        let diff = diff_values(&a, &b, &FieldTraits::new());
        assert_eq!(diff.items.len(), 1);
        assert_eq!(diff.items[0].path.to_string(), "healthChecks");
    }

    #[test]
    fn test_excluded_paths_do_not_diff() {
        let traits = FieldTraits::new()
            .output_only(FieldPath::new().field("selfLink"))
            .system(FieldPath::new().field("fingerprint"));
        let a = json!({"selfLink": "x", "fingerprint": "f1", "name": "n"});
        let b = json!({"selfLink": "y", "fingerprint": "f2", "name": "n"});
        assert!(!diff_values(&a, &b, &traits).has_diff());
    }
}

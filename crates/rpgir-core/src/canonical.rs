//! Deterministic document canonicalization.
//!
//! [`canonicalize`] maps any document to one order-independent normal form:
//! the form hashing and diffing operate on. It is pure, total, and
//! idempotent, and it never mutates its input. The mutation framework is the
//! only production caller; it canonicalizes every draft once, right before
//! rehashing and persisting.

use serde_json::Value;

use crate::document::Document;

/// Produces the canonical form of a document.
///
/// Rules: strip `hash`; sort nodes by id and each node's ports by name;
/// sort edges by their composite key; sort all free-form string lists;
/// normalize every `TypeExpr`; sort layout files by path and barrel exports
/// per barrel; deep-sort the generic constraints metadata; finally round-trip
/// through a key-ordered JSON tree so even untouched nested structures come
/// out in canonical order.
pub fn canonicalize(doc: &Document) -> Document {
    let mut out = doc.clone();
    out.hash = String::new();

    for node in &mut out.nodes {
        for port in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
            if let Some(ty) = &port.ty {
                port.ty = Some(ty.normalized());
            }
        }
        node.inputs.sort_by(|a, b| a.name.cmp(&b.name));
        node.outputs.sort_by(|a, b| a.name.cmp(&b.name));
        node.tags.sort();
        node.deps.sort();
        if let Some(contracts) = &mut node.contracts {
            contracts.pre.sort();
            contracts.post.sort();
            contracts.invariants.sort();
        }
    }
    out.nodes.sort_by(|a, b| a.id.cmp(&b.id));
    out.edges.sort_by(|a, b| a.key().cmp(&b.key()));

    out.constraints.runtimes.sort();
    out.constraints.licenses.allow.sort();
    out.constraints.licenses.deny.sort();
    out.constraints.policy.deny_tags.sort();
    out.constraints.policy.require_tags.sort();
    out.constraints.policy.dir_overrides.sort_keys();
    out.constraints.metadata = canonical_metadata(&out.constraints.metadata);

    if let Some(layout) = &mut out.layout {
        layout.files.sort_by(|a, b| a.path.cmp(&b.path));
        for barrel in &mut layout.barrels {
            barrel.exports.sort();
        }
        layout.barrels.sort_by(|a, b| a.dir.cmp(&b.dir));
    }

    reserialize(out)
}

/// Round-trips a document through the canonical JSON tree. `Document` always
/// serializes cleanly, so the fallback branch is unreachable in practice; it
/// exists to keep canonicalization total.
fn reserialize(doc: Document) -> Document {
    let Ok(tree) = serde_json::to_value(&doc) else {
        return doc;
    };
    serde_json::from_value(canonical_value(&tree)).unwrap_or(doc)
}

/// Rebuilds a JSON value with every object's keys in sorted order. Array
/// element order is preserved; element *contents* are canonicalized.
pub fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let rebuilt: serde_json::Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), canonical_value(v)))
                .collect();
            Value::Object(rebuilt)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        _ => value.clone(),
    }
}

/// Canonicalizes a free-form metadata value: keys sorted recursively, and
/// arrays whose elements are objects additionally sorted by their canonical
/// serialization. Scalar arrays keep their order (it may be meaningful).
pub fn canonical_metadata(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let rebuilt: serde_json::Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), canonical_metadata(v)))
                .collect();
            Value::Object(rebuilt)
        }
        Value::Array(items) => {
            let mut rebuilt: Vec<Value> = items.iter().map(canonical_metadata).collect();
            if rebuilt.iter().all(Value::is_object) {
                rebuilt.sort_by_key(|v| serde_json::to_string(v).unwrap_or_default());
            }
            Value::Array(rebuilt)
        }
        _ => value.clone(),
    }
}

/// Convenience used by tests and views: whether a document is already in
/// canonical form (modulo the `hash` field, which canonical form strips).
pub fn is_canonical(doc: &Document) -> bool {
    let mut stripped = doc.clone();
    stripped.hash = String::new();
    canonicalize(doc) == stripped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EdgeDef, NodeDef, NodeKind, PortDef};
    use crate::types::{ScalarName, TypeExpr};
    use serde_json::json;

    fn sample_doc() -> Document {
        let mut doc = Document::new("demo", "demo project");
        let mut b = NodeDef::new("beta@1", NodeKind::Module, "consumer");
        b.inputs.push(PortDef::new("zig"));
        b.inputs.push(PortDef::new("alpha"));
        b.tags = vec!["io".into(), "core".into()];
        let mut a = NodeDef::new("alpha@1", NodeKind::Module, "producer");
        a.outputs.push(PortDef::typed(
            "out",
            TypeExpr::Scalar {
                name: ScalarName::String,
            },
        ));
        doc.nodes.push(b);
        doc.nodes.push(a);
        doc.edges.push(EdgeDef::new("alpha@1", "out", "beta@1", "zig"));
        doc.edges.push(EdgeDef::new("alpha@1", "out", "beta@1", "alpha"));
        doc.constraints.metadata = json!({"z": 1, "a": {"y": 2, "b": 3}});
        doc.hash = "deadbeefdeadbeef".into();
        doc
    }

    #[test]
    fn canonicalize_sorts_nodes_ports_edges_and_strips_hash() {
        let canon = canonicalize(&sample_doc());
        assert_eq!(canon.hash, "");
        let ids: Vec<&str> = canon.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha@1", "beta@1"]);
        let inputs: Vec<&str> = canon.nodes[1]
            .inputs
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(inputs, vec!["alpha", "zig"]);
        let keys: Vec<String> = canon.edges.iter().map(|e| e.key()).collect();
        assert_eq!(
            keys,
            vec!["alpha@1.out->beta@1.alpha", "alpha@1.out->beta@1.zig"]
        );
        assert_eq!(canon.nodes[1].tags, vec!["core", "io"]);
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let once = canonicalize(&sample_doc());
        let twice = canonicalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn canonicalize_is_order_independent() {
        let doc = sample_doc();
        let mut permuted = doc.clone();
        permuted.nodes.reverse();
        permuted.edges.reverse();
        permuted.nodes[0].inputs.reverse();
        assert_eq!(canonicalize(&doc), canonicalize(&permuted));
    }

    #[test]
    fn canonicalize_ignores_hash_differences() {
        let doc = sample_doc();
        let mut other = doc.clone();
        other.hash = "0000000000000000".into();
        assert_eq!(canonicalize(&doc), canonicalize(&other));
    }

    #[test]
    fn canonicalize_never_mutates_input() {
        let doc = sample_doc();
        let before = doc.clone();
        let _ = canonicalize(&doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn metadata_objects_deep_sorted_and_object_arrays_ordered() {
        let meta = json!({
            "z": [{"b": 2, "a": 1}, {"a": 0}],
            "a": {"y": [3, 1, 2]}
        });
        let canon = canonical_metadata(&meta);
        assert_eq!(
            serde_json::to_string(&canon).unwrap(),
            r#"{"a":{"y":[3,1,2]},"z":[{"a":0},{"a":1,"b":2}]}"#
        );
    }

    #[test]
    fn canonical_value_sorts_keys_but_keeps_array_order() {
        let v = json!({"b": 1, "a": [{"z": 1, "a": 2}, {"m": 3}]});
        let canon = canonical_value(&v);
        assert_eq!(
            serde_json::to_string(&canon).unwrap(),
            r#"{"a":[{"a":2,"z":1},{"m":3}],"b":1}"#
        );
    }

    #[test]
    fn is_canonical_detects_unsorted_documents() {
        let doc = sample_doc();
        assert!(!is_canonical(&doc));
        assert!(is_canonical(&canonicalize(&doc)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_json() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(|n| json!(n)),
                "[a-z]{0,8}".prop_map(Value::String),
            ];
            leaf.prop_recursive(3, 24, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                        .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        proptest! {
            #[test]
            fn canonical_value_is_idempotent(v in arb_json()) {
                let once = canonical_value(&v);
                prop_assert_eq!(canonical_value(&once), once);
            }

            #[test]
            fn canonical_metadata_is_idempotent(v in arb_json()) {
                let once = canonical_metadata(&v);
                prop_assert_eq!(canonical_metadata(&once), once);
            }
        }
    }
}

use proptest::prelude::*;
use ruleval::primitives::{
    PathPart, resolve_property_path, resolve_simple_path, split_property_path,
};
use ruleval::{PathSegment, path_to_string};
use serde_json::{Value, json};

/// Strategy for arbitrary JSON values nested up to `depth` levels.
fn arb_json(depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|i| json!(i)),
        "[a-z]{1,8}".prop_map(Value::String),
    ];

    leaf.prop_recursive(depth, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z][a-z0-9.]{0,5}", inner), 1..5).prop_map(|pairs| {
                Value::Object(pairs.into_iter().collect())
            }),
        ]
    })
}

/// Escapes a key so that it survives `split_property_path` as one segment.
fn escape_key(key: &str) -> String {
    key.replace('\\', "\\\\").replace('.', "\\.")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn empty_path_resolves_to_value(value in arb_json(3)) {
        prop_assert_eq!(resolve_simple_path("", &value), Some(&value));
        let resolved = resolve_property_path(&[], &value);
        prop_assert_eq!(resolved.len(), 1);
        prop_assert!(resolved[0].path.is_empty());
    }

    #[test]
    fn escaped_keys_resolve_to_their_value(value in arb_json(3)) {
        if let Value::Object(map) = &value {
            for (key, child) in map {
                let path = escape_key(key);
                let parts = split_property_path(&path);
                prop_assert_eq!(parts.clone(), vec![PathPart::Name(key.clone())]);
                let resolved = resolve_property_path(&parts, &value);
                prop_assert_eq!(resolved[0].value, Some(child));
                prop_assert_eq!(path_to_string(&resolved[0].path), path);
            }
        }
    }

    #[test]
    fn wildcard_yields_one_location_per_element(
        n in 0..8usize,
        elem in arb_json(1),
    ) {
        let items: Vec<Value> = (0..n).map(|_| elem.clone()).collect();
        let data = json!({"items": items});
        let resolved = resolve_property_path(&split_property_path("items.*"), &data);
        prop_assert_eq!(resolved.len(), n);
        for (i, location) in resolved.iter().enumerate() {
            prop_assert_eq!(
                location.path.clone(),
                vec![PathSegment::from("items"), PathSegment::Index(i)]
            );
        }
    }

    #[test]
    fn path_resolution_never_panics(
        path in "\\PC{0,30}",
        value in arb_json(2),
    ) {
        let _ = resolve_simple_path(&path, &value);
        let _ = resolve_property_path(&split_property_path(&path), &value);
    }
}

use proptest::prelude::*;
use ruleval::{EmptyCondition, Number, PathSegment, Rule, RuleSet, Validator};
use serde_json::{Value, json};

fn arb_json(depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|i| json!(i)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ];

    leaf.prop_recursive(depth, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 1..5).prop_map(|pairs| {
                Value::Object(pairs.into_iter().collect())
            }),
        ]
    })
}

fn sample_rules() -> RuleSet {
    RuleSet::new()
        .property("a", [Rule::required(), Rule::email().skip_on_error(true)])
        .property("b", [Rule::each([Rule::new(Number::new().max(10))])])
        .property(
            "c",
            [Rule::nested(RuleSet::new().property("x.y", [Rule::required()]))
                .unwrap()
                .skip_on_empty(EmptyCondition::when_empty())],
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn empty_rule_set_is_always_valid(value in arb_json(3)) {
        let result = Validator::new().validate(&value, RuleSet::new()).unwrap();
        prop_assert!(result.is_valid());
    }

    #[test]
    fn validation_is_deterministic(value in arb_json(3)) {
        let validator = Validator::new();
        let first = validator.validate(&value, sample_rules()).unwrap();
        let second = validator.validate(&value, sample_rules()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn each_reports_exactly_the_failing_indices(items in prop::collection::vec(-50i64..50, 0..20)) {
        let result = Validator::new()
            .validate(&json!(items), Rule::each([Rule::new(Number::new().max(13))]))
            .unwrap();
        let expected: Vec<Vec<PathSegment>> = items
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 13)
            .map(|(i, _)| vec![PathSegment::Index(i)])
            .collect();
        let actual: Vec<Vec<PathSegment>> = result.errors().iter().map(|e| e.path.clone()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn when_empty_never_skips_zero_or_false(value in prop_oneof![Just(json!(0)), Just(json!(false))]) {
        let rule = Rule::callback(|_, _| ruleval::ValidationError::new("ran").into())
            .skip_on_empty(EmptyCondition::when_empty());
        let result = Validator::new().validate(&value, rule).unwrap();
        prop_assert_eq!(result.len(), 1);
    }
}

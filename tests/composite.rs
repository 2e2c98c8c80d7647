use ruleval::*;
use serde_json::{Value, json};

fn validate(value: Value, rules: impl Into<RuleSpec>) -> ValidationResult {
    Validator::new().validate(&value, rules).expect("rules are well-formed")
}

fn paths(result: &ValidationResult) -> Vec<Vec<PathSegment>> {
    result.errors().iter().map(|e| e.path.clone()).collect()
}

fn max(n: i32) -> Rule {
    Rule::new(Number::new().max(n))
}

fn min(n: i32) -> Rule {
    Rule::new(Number::new().min(n))
}

// ─── Each ───────────────────────────────────────────────────────────────────

#[test]
fn each_reports_failing_indices() {
    let result = validate(json!([10, 20, 30]), Rule::each([max(13)]));
    assert_eq!(
        paths(&result),
        vec![vec![PathSegment::Index(1)], vec![PathSegment::Index(2)]]
    );
}

#[test]
fn each_under_property_prefixes_property_then_index() {
    let rules = RuleSet::new().property("scores", [Rule::each([max(13)])]);
    let result = validate(json!({"scores": [1, 99]}), rules);
    assert_eq!(result.errors()[0].path_string(), "scores.1");
}

#[test]
fn each_over_object_uses_keys() {
    let result = validate(json!({"a": 1, "b": 50}), Rule::each([max(13)]));
    assert_eq!(paths(&result), vec![vec![PathSegment::from("b")]]);
}

#[test]
fn each_rejects_non_iterable_once() {
    let result = validate(json!(5), Rule::each([max(13)]));
    assert_eq!(result.error_messages(), vec!["{property} must be array or iterable."]);
    assert!(result.errors()[0].path.is_empty());
}

#[test]
fn each_with_named_inner_rules() {
    let inner = RuleSet::new()
        .property("id", [Rule::required()])
        .property("qty", [min(1)]);
    let rules = RuleSet::new().property("items", [Rule::each(inner)]);
    let result = validate(
        json!({"items": [{"id": "a", "qty": 2}, {"qty": 0}]}),
        rules,
    );
    let rendered: Vec<String> = result.errors().iter().map(|e| e.path_string()).collect();
    assert_eq!(rendered, vec!["items.1.id", "items.1.qty"]);
}

#[test]
fn each_evaluates_every_element() {
    let result = validate(json!(["", "", ""]), Rule::each([Rule::required()]));
    assert_eq!(result.len(), 3);
}

// ─── Nested ─────────────────────────────────────────────────────────────────

#[test]
fn nested_dotted_path_reaches_deep_property() {
    let rule = Rule::nested(RuleSet::new().property("author.age", [min(20)])).unwrap();
    let result = validate(json!({"author": {"name": "Dmitry", "age": 18}}), rule);
    assert_eq!(result.len(), 1);
    assert_eq!(
        result.errors()[0].path,
        vec![PathSegment::from("author"), PathSegment::from("age")]
    );
}

#[test]
fn nested_missing_path_with_flag_reports_not_found() {
    let rule = Rule::new(
        Nested::new(RuleSet::new().property("author.age", [min(20)]))
            .unwrap()
            .require_property_path(),
    );
    let result = validate(json!({"author": {"name": "Dmitry"}}), rule);
    assert_eq!(result.len(), 1);
    let error = &result.errors()[0];
    assert_eq!(error.message, "Property \"{path}\" is not found.");
    assert_eq!(error.parameters["path"], json!("author.age"));
    assert_eq!(error.path_string(), "author.age");
}

#[test]
fn nested_missing_path_without_flag_validates_null() {
    let rule = Rule::nested(RuleSet::new().property("author.age", [Rule::required()])).unwrap();
    let result = validate(json!({"author": {}}), rule);
    assert_eq!(result.error_messages(), vec!["{property} not passed."]);
    assert_eq!(result.errors()[0].parameters["property"], json!("author.age"));

    let skipped = Rule::nested(RuleSet::new().property(
        "author.age",
        [Rule::required().skip_on_empty(EmptyCondition::WhenMissing)],
    ))
    .unwrap();
    assert!(validate(json!({"author": {}}), skipped).is_valid());
}

#[test]
fn nested_rejects_scalars() {
    let rule = Rule::nested(RuleSet::new().property("a", [Rule::required()])).unwrap();
    let result = validate(json!("text"), rule);
    assert_eq!(
        result.error_messages(),
        vec!["{property} must be either an array or an object."]
    );
}

#[test]
fn nested_wildcard_expands_over_elements() {
    let rule = Rule::nested(RuleSet::new().property("items.*.qty", [min(1)])).unwrap();
    let result = validate(json!({"items": [{"qty": 1}, {"qty": 0}, {"qty": -2}]}), rule);
    let rendered: Vec<String> = result.errors().iter().map(|e| e.path_string()).collect();
    assert_eq!(rendered, vec!["items.1.qty", "items.2.qty"]);
}

#[test]
fn nested_escaped_dot_is_a_single_key() {
    let rule = Rule::nested(RuleSet::new().property("a\\.b", [Rule::required()])).unwrap();
    let result = validate(json!({"a.b": "", "a": {"b": "x"}}), rule);
    assert_eq!(result.errors()[0].path, vec![PathSegment::from("a.b")]);
    assert_eq!(result.errors()[0].path_string(), "a\\.b");
}

#[test]
fn nested_inside_each() {
    let nested = Rule::nested(RuleSet::new().property("profile.email", [Rule::email()])).unwrap();
    let result = validate(
        json!([{"profile": {"email": "ok@example.com"}}, {"profile": {"email": "broken"}}]),
        Rule::each([nested]),
    );
    assert_eq!(result.errors()[0].path_string(), "1.profile.email");
}

#[test]
fn nested_indexes_into_arrays() {
    let rule = Rule::nested(RuleSet::new().property("1", [max(5)])).unwrap();
    let result = validate(json!([1, 10]), rule);
    assert_eq!(paths(&result), vec![vec![PathSegment::Index(1)]]);
}

#[test]
fn nested_compare_reads_sibling_in_walked_record() {
    let repeat = Rule::nested(RuleSet::new().property(
        "password_repeat",
        [Rule::new(Compare::to_property(CompareOperator::Equal, "password"))],
    ))
    .unwrap();
    let rules = RuleSet::new().property("user", [repeat]);

    let same = json!({"user": {"password": "s3cret", "password_repeat": "s3cret"}});
    assert!(validate(same, rules.clone()).is_valid());

    let differs = json!({"user": {"password": "s3cret", "password_repeat": "other"}});
    let result = validate(differs, rules);
    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].path_string(), "user.password_repeat");
}

#[test]
fn nested_deep_path_reads_siblings_of_last_segment() {
    let rule = Rule::nested(RuleSet::new().property(
        "account.vat",
        [Rule::required().when(When::matching("kind", json!("company")))],
    ))
    .unwrap();
    let company = json!({"kind": "person", "account": {"kind": "company", "vat": ""}});
    assert_eq!(
        validate(company, rule.clone()).error_messages(),
        vec!["{property} cannot be blank."]
    );

    let person = json!({"kind": "company", "account": {"kind": "person", "vat": ""}});
    assert!(validate(person, rule).is_valid());
}

#[test]
fn nested_wildcard_compares_within_each_element() {
    let rule = Rule::nested(RuleSet::new().property(
        "ranges.*.to",
        [Rule::new(Compare::to_property(
            CompareOperator::GreaterThanOrEqual,
            "from",
        ))],
    ))
    .unwrap();
    let result = validate(
        json!({"ranges": [{"from": 1, "to": 5}, {"from": 9, "to": 2}]}),
        rule,
    );
    let rendered: Vec<String> = result.errors().iter().map(|e| e.path_string()).collect();
    assert_eq!(rendered, vec!["ranges.1.to"]);
}

#[test]
fn nested_requires_rules() {
    assert!(matches!(
        Nested::new(RuleSet::new()),
        Err(ConfigError::EmptyRules { .. })
    ));
}

// ─── Composite / AnyRule / StopOnError ──────────────────────────────────────

#[test]
fn composite_applies_bundle_to_same_value() {
    let valid_url = Rule::composite([
        Rule::required(),
        Rule::url(),
        Rule::new(Length::max(20)),
    ])
    .unwrap();
    let rules = RuleSet::new().property("site", [valid_url]);
    let result = validate(json!({"site": "https://example.com/a/very/long/path"}), rules);
    assert_eq!(
        result.error_messages(),
        vec!["{property} must contain at most {max} {unit}."]
    );
    assert_eq!(result.errors()[0].path_string(), "site");
}

#[test]
fn composite_honours_skip_on_error_inside_bundle() {
    let bundle = Rule::composite([
        Rule::required(),
        Rule::email().skip_on_error(true),
    ])
    .unwrap();
    let result = validate(json!(""), bundle);
    assert_eq!(result.len(), 1);
}

#[test]
fn any_rule_passes_when_one_passes() {
    let rule = Rule::any([Rule::new(TypeOf::integer()), Rule::new(TypeOf::float())]).unwrap();
    assert!(validate(json!(1.5), rule.clone()).is_valid());

    let result = validate(json!("1.5"), rule);
    assert_eq!(
        result.error_messages(),
        vec!["At least one of the inner rules must pass the validation."]
    );
}

#[test]
fn any_rule_counts_skipped_rule_as_passing() {
    let rule = Rule::any([
        Rule::new(TypeOf::integer()).when(When::matching("", json!("never"))),
        Rule::new(TypeOf::float()),
    ])
    .unwrap();
    assert!(validate(json!("text"), rule).is_valid());
}

#[test]
fn stop_on_error_keeps_first_failure_only() {
    let rule = Rule::stop_on_error([
        Rule::new(Length::min(10)),
        Rule::new(MatchRegex::new("^[0-9]+$").unwrap()),
    ])
    .unwrap();
    let result = validate(json!("abc"), rule);
    assert_eq!(
        result.error_messages(),
        vec!["{property} must contain at least {min} {unit}."]
    );
}

#[test]
fn propagated_options_reach_inner_rules() {
    let rule = Rule::each([Rule::required()])
        .skip_on_empty(EmptyCondition::WhenNull)
        .propagate_options();
    let result = validate(json!([null, "", "x"]), rule);
    assert_eq!(paths(&result), vec![vec![PathSegment::Index(1)]]);
}

#[test]
fn errors_under_prefix() {
    let rules = RuleSet::new()
        .property("items", [Rule::each([max(5)])])
        .property("name", [Rule::required()]);
    let result = validate(json!({"items": [9, 1, 9], "name": ""}), rules);
    let prefix = [PathSegment::from("items")];
    assert_eq!(result.errors_under(&prefix).count(), 2);
    let exact = [PathSegment::from("items"), PathSegment::Index(2)];
    assert_eq!(result.errors_at(&exact).count(), 1);
    assert_eq!(
        result.first_error_messages_indexed_by_path(),
        vec![
            ("items.0".to_string(), "{property} must be no greater than {max}."),
            ("items.2".to_string(), "{property} must be no greater than {max}."),
            ("name".to_string(), "{property} cannot be blank."),
        ]
    );
}

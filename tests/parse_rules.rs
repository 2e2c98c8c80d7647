use ruleval::*;
use serde_json::json;

const SIGNUP_RULES: &str = r#"
login:
  - type: required
  - type: length
    min: 3
    max: 20
    skip_on_error: true
email:
  type: email
  skip_on_empty: true
age:
  - type: number
    number_type: integer
    min: 18
password_repeat:
  - type: compare
    operator: "=="
    target_property: password
vat:
  - type: required
    when:
      match:
        path: kind
        condition: company
tags:
  - type: each
    rules:
      - type: length
        max: 5
"#;

#[test]
fn yaml_rule_set_keeps_property_order() {
    let rules = parse_rules(SIGNUP_RULES).expect("rules parse");
    let names: Vec<&str> = rules.iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        vec!["login", "email", "age", "password_repeat", "vat", "tags"]
    );
    assert_eq!(rules.get("login").map(|r| r.len()), Some(2));
    assert!(rules.get("login").unwrap()[1].is_skip_on_error());
    assert_eq!(
        rules.get("email").unwrap()[0].empty_condition(),
        Some(EmptyCondition::when_empty())
    );
}

#[test]
fn parsed_rules_validate_data() {
    let rules = parse_rules(SIGNUP_RULES).unwrap();
    let data = json!({
        "login": "al",
        "email": "",
        "age": 17,
        "password": "a",
        "password_repeat": "b",
        "kind": "company",
        "tags": ["short", "too-long"]
    });
    let result = Validator::new().validate(&data, rules).unwrap();
    let rendered: Vec<String> = result.errors().iter().map(|e| e.path_string()).collect();
    assert_eq!(rendered, vec!["login", "age", "password_repeat", "vat", "tags.1"]);
}

#[test]
fn json_input_is_accepted() {
    let rules = parse_rules(r#"[{"type": "required"}, {"type": "email"}]"#).unwrap();
    assert_eq!(rules.get(RuleSet::ROOT).map(|r| r.len()), Some(2));
    let result = Validator::new().validate(&json!("nope"), rules).unwrap();
    assert_eq!(result.error_messages(), vec!["{property} is not a valid email address."]);
}

#[test]
fn single_rule_document_applies_to_root() {
    let rules = parse_rules("type: in\nvalues: [a, b]\nstrict: true\n").unwrap();
    let result = Validator::new().validate(&json!("c"), rules).unwrap();
    assert!(result.errors()[0].path.is_empty());
}

#[test]
fn unknown_rule_type_is_rejected_at_parse_time() {
    let err = parse_rules("name:\n  type: frobnicate\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn custom_rules_parse_and_need_a_handler() {
    let rules = parse_rules("name:\n  type: custom\n  name: slug\n  parameters:\n    max: 3\n").unwrap();
    let err = Validator::new().validate(&json!({"name": "x"}), rules).unwrap_err();
    assert_eq!(
        err,
        ConfigError::HandlerNotFound {
            kind: "slug".to_string()
        }
    );
}

#[test]
fn invalid_regex_is_rejected_at_parse_time() {
    let err = parse_rules("code:\n  type: match_regex\n  pattern: \"(\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRule { .. }));
}

#[test]
fn invalid_jsonpath_condition_is_rejected_at_parse_time() {
    let input = r#"
code:
  type: required
  when:
    match:
      path: "$["
      condition: 1
"#;
    assert!(matches!(
        parse_rules(input),
        Err(ConfigError::InvalidCondition { .. })
    ));
}

#[test]
fn serialized_rules_parse_back_to_equal_rules() {
    let rules = parse_rules(SIGNUP_RULES).unwrap();
    let yaml = serialize_rules(&rules).unwrap();
    let reparsed = parse_rules(&yaml).unwrap();
    assert_eq!(rules, reparsed);
}

#[test]
fn callbacks_cannot_be_serialized() {
    let rules = RuleSet::root([Rule::callback(|_, _| ValidationResult::new())]);
    assert!(matches!(
        serialize_rules(&rules),
        Err(ConfigError::Serialize { .. })
    ));

    let rules = RuleSet::root([Rule::required().when_fn(|_, _| true)]);
    assert!(matches!(
        serialize_rules(&rules),
        Err(ConfigError::Serialize { .. })
    ));
}

#[test]
fn validate_yaml_convenience() {
    let result = validate_yaml("- type: required\n", &json!(null)).unwrap();
    assert_eq!(result.len(), 1);
}

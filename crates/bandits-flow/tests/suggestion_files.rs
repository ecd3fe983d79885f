use std::fs;

use bandits_core::errors::FlowError;
use bandits_core::ParamValue;
use bandits_flow::{StaticSuggestionLoader, Suggestion, SuggestionLoader, YamlSuggestionLoader};

const UCB1: &str = r#"
- name: c
  type: uniform
  low: 0.1
  high: 2.0
- name: warmup
  type: int
  low: 1
  high: 5
- name: mode
  type: categorical
  choices: [fast, 3, true]
- name: tau
  type: loguniform
  low: 0.01
  high: 1.0
- name: step
  type: float
  low: 0.0
  high: 1.0
  step: 0.1
- name: q
  type: discrete_uniform
  low: 0.0
  high: 1.0
  q: 0.25
"#;

#[test]
fn yaml_lists_load_in_order_with_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("ucb1.yml"), UCB1).unwrap();
    let loader = YamlSuggestionLoader::new(dir.path());

    let suggestions = loader.load("ucb1").expect("load");

    let names: Vec<&str> = suggestions.iter().map(Suggestion::name).collect();
    assert_eq!(names, vec!["c", "warmup", "mode", "tau", "step", "q"]);
    assert_eq!(
        suggestions[1],
        Suggestion::Int {
            name: "warmup".into(),
            low: 1,
            high: 5,
            step: 1,
            log: false,
        }
    );
    assert_eq!(
        suggestions[2],
        Suggestion::Categorical {
            name: "mode".into(),
            choices: vec![ParamValue::from("fast"), ParamValue::Int(3), ParamValue::Bool(true)],
        }
    );
}

#[test]
fn yaml_extension_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("softmax.yaml"), "[]").unwrap();
    let loader = YamlSuggestionLoader::new(dir.path());
    assert!(loader.load("softmax").expect("load").is_empty());
}

#[test]
fn unknown_type_tag_fails_loudly() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("ucb1.yml"),
        "- name: c\n  type: gaussian\n  low: 0\n  high: 1\n",
    )
    .unwrap();
    let err = YamlSuggestionLoader::new(dir.path()).load("ucb1").unwrap_err();
    assert!(matches!(err, FlowError::Config(_)));
    assert_eq!(err.code(), "suggestion-parse");
}

#[test]
fn duplicate_names_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("ucb1.yml"),
        concat!(
            "- {name: c, type: uniform, low: 0, high: 1}\n",
            "- {name: c, type: uniform, low: 1, high: 2}\n",
        ),
    )
    .unwrap();
    let err = YamlSuggestionLoader::new(dir.path()).load("ucb1").unwrap_err();
    assert_eq!(err.code(), "suggestion-duplicate-name");
}

#[test]
fn missing_lists_are_resolve_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = YamlSuggestionLoader::new(dir.path()).load("nobody").unwrap_err();
    assert!(matches!(err, FlowError::Resolve(_)));
    let err = StaticSuggestionLoader::new().load("nobody").unwrap_err();
    assert_eq!(err.code(), "unknown-suggestions");
}

use bandits_core::errors::{ErrorInfo, FlowError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("actor", "epsilon_greedy")
        .with_context("reason", "example")
}

#[test]
fn objective_error_surface() {
    let err = FlowError::Objective(sample_info("objective-no-data", "no data for metric"));
    assert_eq!(err.code(), "objective-no-data");
    assert!(err.info().context.contains_key("actor"));
}

#[test]
fn resolve_error_surface() {
    let err = FlowError::Resolve(sample_info("unknown-actor", "actor not registered"));
    assert_eq!(err.info().code, "unknown-actor");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = FlowError::Config(
        ErrorInfo::new("C001", "bad bounds")
            .with_context("name", "epsilon")
            .with_hint("low must not exceed high"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("config error: bad bounds (code: C001)"));
    assert!(rendered.contains("name=epsilon"));
    assert!(rendered.contains("hint: low must not exceed high"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = FlowError::History(ErrorInfo::new("H001", "unreadable record"));
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "History");
    assert_eq!(json["detail"]["code"], "H001");
    let back: FlowError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}

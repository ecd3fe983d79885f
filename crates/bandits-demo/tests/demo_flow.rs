use std::fs;

use bandits_demo::{bundled_suggestion_dir, demo_loaders, reporter_registry};
use bandits_flow::{load_config, run_flow, FileHistory, FlowConfig, SuggestionLoader};

#[test]
fn bundled_suggestions_cover_every_actor() {
    let loaders = demo_loaders(bundled_suggestion_dir());
    for actor in ["epsilon_greedy", "ucb1", "softmax"] {
        let list = loaders.suggestions.load(actor).expect("suggestions");
        assert_eq!(list.len(), 1, "{actor}");
    }
}

#[test]
fn bundled_flow_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/flows/demo.yaml");
    let config = load_config(path).expect("config");
    assert_eq!(config.actors, vec!["epsilon_greedy", "ucb1", "softmax"]);
    assert_eq!(config.reporter.as_deref(), Some("summary"));
    assert!(config.suggestion_dir.ends_with("suggestions"));
}

#[test]
fn demo_flow_writes_reports_and_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = FlowConfig::new(
        "bernoulli",
        vec!["epsilon_greedy".to_string(), "ucb1".to_string(), "softmax".to_string()],
    );
    config.experiment_name = "demo-test".to_string();
    config.reporter = Some("summary".to_string());
    config.optimize.n_trials = 3;
    config.evaluate.n_iterations = 2;
    config.output_dir = dir.path().join("out");

    let loaders = demo_loaders(bundled_suggestion_dir());
    let history = FileHistory::new(dir.path().join("history"), "demo-test");
    let report = run_flow(&config, &loaders, &reporter_registry(), &history, None).expect("flow");

    assert_eq!(report.optimized.len(), 3);
    assert_eq!(report.artefacts.len(), 2);
    let summary = fs::read_to_string(dir.path().join("out/summary.csv")).expect("summary");
    let mut lines = summary.lines();
    assert_eq!(
        lines.next(),
        Some("actor,replicates,mean_cum_reward,mean_cum_regret")
    );
    assert_eq!(lines.count(), 3);
    let best_bytes = fs::read(dir.path().join("out/best_params.json")).unwrap();
    let best: serde_json::Value = serde_json::from_slice(&best_bytes).unwrap();
    assert!(best["ucb1"]["c"].as_f64().is_some());
    assert!(history.latest_run("bernoulli").unwrap().is_some());

    let again = run_flow(&config, &loaders, &reporter_registry(), &history, None).expect("rerun");
    assert!(again.optimized.is_empty());
    assert_eq!(again.best_params, report.best_params);
}

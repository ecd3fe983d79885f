use std::fs;
use std::time::Duration;

use bandits_flow::{load_config, Direction, TrialFailurePolicy};

#[test]
fn relative_directories_resolve_against_the_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("flow.yaml");
    fs::write(
        &path,
        r#"
experiment_name: nightly
scenario: bernoulli
actors: [epsilon_greedy, ucb1]
reporter: summary
optimize:
  n_trials: 8
  timeout_secs: 2.5
  direction: minimize
  metric: cum_regret
  seed: 9
  on_trial_error: skip
evaluate:
  n_iterations: 4
  save_metrics: false
revival:
  optimize: [ucb1]
concurrency: 2
history_dir: /var/tmp/bandits
"#,
    )
    .unwrap();

    let config = load_config(&path).expect("load");

    assert_eq!(config.output_dir, dir.path().join("output"));
    assert_eq!(config.suggestion_dir, dir.path().join("suggestions"));
    assert_eq!(config.history_dir, std::path::PathBuf::from("/var/tmp/bandits"));

    let optimize = config.optimize.to_opts();
    assert_eq!(optimize.direction, Direction::Minimize);
    assert_eq!(optimize.timeout, Some(Duration::from_millis(2500)));
    assert_eq!(optimize.on_trial_error, TrialFailurePolicy::Skip);
    assert_eq!(config.evaluate.to_opts().seed, 0);
    assert!(!config.evaluate.save_metrics);

    let ucb1 = config.revival.flags_for("ucb1");
    assert!(ucb1.optimize);
    assert!(!ucb1.evaluate);
    assert!(!config.revival.flags_for("epsilon_greedy").optimize);
}

#[test]
fn invalid_documents_are_config_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("flow.yaml");

    fs::write(&path, "scenario: s\nactors: []\n").unwrap();
    assert_eq!(load_config(&path).unwrap_err().code(), "config-actors");

    fs::write(&path, "scenario: s\nactors: [a]\nevaluate: {n_iterations: 0}\n").unwrap();
    assert_eq!(load_config(&path).unwrap_err().code(), "config-iterations");

    fs::write(&path, "scenario: s\nactors: [a]\noptimize: {direction: sideways}\n").unwrap();
    assert_eq!(load_config(&path).unwrap_err().code(), "config-parse");

    let missing = dir.path().join("absent.yaml");
    assert_eq!(load_config(&missing).unwrap_err().code(), "config-read");
}

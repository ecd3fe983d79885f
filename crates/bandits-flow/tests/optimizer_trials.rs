mod common;

use std::time::Duration;

use bandits_core::errors::FlowError;
use bandits_core::ParamValue;
use bandits_flow::{Direction, OptimizeOpts, Optimizer, TrialFailurePolicy, TrialState};

use common::{loaders, SeedLog};

fn opts(direction: Direction) -> OptimizeOpts {
    OptimizeOpts {
        n_trials: 40,
        timeout: None,
        direction,
        metric: "score".to_string(),
        seed: 11,
        on_trial_error: TrialFailurePolicy::Abort,
    }
}

#[test]
fn maximize_and_minimize_pick_grid_extremes() {
    let loaders = loaders(&SeedLog::default());
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );

    let best = optimizer
        .optimize("count", "gain", &opts(Direction::Maximize))
        .expect("maximize");
    assert_eq!(best.best_params["gain"], ParamValue::Float(1.0));
    assert_eq!(best.best_value, 3.0);
    assert_eq!(best.n_complete, 40);

    let worst = optimizer
        .optimize("count", "gain", &opts(Direction::Minimize))
        .expect("minimize");
    assert_eq!(worst.best_params["gain"], ParamValue::Float(0.0));
    assert_eq!(worst.best_value, 0.0);
}

#[test]
fn same_seed_reproduces_the_study() {
    let loaders = loaders(&SeedLog::default());
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );
    let mut short = opts(Direction::Maximize);
    short.n_trials = 5;
    let first = optimizer.optimize("count", "gain", &short).expect("first");
    let second = optimizer.optimize("count", "gain", &short).expect("second");
    assert_eq!(first, second);
}

#[test]
fn each_trial_runs_a_single_replicate() {
    let log = SeedLog::default();
    let loaders = loaders(&log);
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );
    let mut three = opts(Direction::Maximize);
    three.n_trials = 3;
    optimizer.optimize("count", "gain", &three).expect("optimize");
    let seeds = log.actor_seeds();
    assert_eq!(seeds.len(), 3);
    assert_eq!(seeds, log.scenario_seeds());
}

#[test]
fn missing_metric_aborts_by_default() {
    let loaders = loaders(&SeedLog::default());
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );
    let mut bad_metric = opts(Direction::Maximize);
    bad_metric.metric = "regret".to_string();
    let err = optimizer
        .optimize("count", "gain", &bad_metric)
        .unwrap_err();
    assert_eq!(err.code(), "objective-no-data");
}

#[test]
fn skip_policy_records_failures_then_reports_no_completed_trials() {
    let loaders = loaders(&SeedLog::default());
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );
    let mut skip = opts(Direction::Maximize);
    skip.n_trials = 4;
    skip.on_trial_error = TrialFailurePolicy::Skip;

    // An empty scenario yields empty replicates: no data for any trial.
    let err = optimizer.optimize("empty", "gain", &skip).unwrap_err();
    assert!(matches!(err, FlowError::Trial(_)));
    assert_eq!(err.code(), "no-completed-trials");
    assert_eq!(
        err.info().context.get("trials").map(String::as_str),
        Some("4")
    );
}

#[test]
fn skip_policy_keeps_going_past_failed_trials() {
    let loaders = loaders(&SeedLog::default());
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );
    let mut skip = opts(Direction::Maximize);
    skip.on_trial_error = TrialFailurePolicy::Skip;

    // `picky` errors below gain 0.25 and scores NaN at 0.25.
    let summary = optimizer.optimize("count", "picky", &skip).expect("optimize");
    assert!(summary.n_failed > 0);
    assert!(summary.n_complete > 0);
    assert_eq!(summary.n_failed + summary.n_complete, 40);
    let best_gain = summary.best_params["gain"].as_f64().expect("gain");
    assert!(best_gain >= 0.5);
    assert!(summary.best_value.is_finite());

    let failed: Vec<_> = summary
        .trials
        .iter()
        .filter(|trial| trial.state == TrialState::Failed)
        .collect();
    assert!(failed.iter().all(|trial| trial.value.is_none()));
    assert!(failed
        .iter()
        .all(|trial| trial.params["gain"].as_f64().expect("gain") < 0.5));
}

#[test]
fn non_finite_objective_aborts_by_default() {
    let loaders = loaders(&SeedLog::default());
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );
    let err = optimizer
        .optimize("count", "picky", &opts(Direction::Maximize))
        .unwrap_err();
    assert!(matches!(
        err.code(),
        "objective-not-finite" | "actor-failed"
    ));
}

#[test]
fn elapsed_timeout_stops_before_the_first_trial() {
    let loaders = loaders(&SeedLog::default());
    let optimizer = Optimizer::new(
        loaders.scenarios.as_ref(),
        loaders.actors.as_ref(),
        loaders.suggestions.as_ref(),
    );
    let mut timed = opts(Direction::Maximize);
    timed.timeout = Some(Duration::ZERO);
    let err = optimizer.optimize("count", "gain", &timed).unwrap_err();
    assert_eq!(err.code(), "no-completed-trials");
}

#[test]
fn non_positive_timeout_is_unbounded() {
    assert_eq!(OptimizeOpts::timeout_from_secs(0.0), None);
    assert_eq!(OptimizeOpts::timeout_from_secs(-3.0), None);
    assert_eq!(
        OptimizeOpts::timeout_from_secs(1.5),
        Some(Duration::from_millis(1500))
    );
}

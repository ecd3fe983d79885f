use std::time::{Duration, Instant};

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{derive_substream_seed, ActorLoader, Params, ScenarioLoader, SimulationResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::simulator::Simulator;
use crate::study::{Direction, Study, TrialRecord, TrialState};
use crate::suggestion::{Suggester, SuggestionLoader};

/// What happens when a trial's simulation or objective fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrialFailurePolicy {
    /// Propagate the error and stop the optimisation.
    #[default]
    Abort,
    /// Record the trial as failed and continue with the next one.
    Skip,
}

/// Options for one optimisation run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOpts {
    /// Maximum number of trials.
    pub n_trials: usize,
    /// Wall-clock budget checked before each trial; `None` is unbounded.
    pub timeout: Option<Duration>,
    /// Ranking direction of the objective.
    pub direction: Direction,
    /// Metric reduced into the objective.
    pub metric: String,
    /// Seed of the search algorithm and of the trial replicates.
    pub seed: u64,
    /// Failed-trial policy.
    pub on_trial_error: TrialFailurePolicy,
}

impl OptimizeOpts {
    /// Converts a timeout in seconds, where values `<= 0` mean unbounded.
    pub fn timeout_from_secs(secs: f64) -> Option<Duration> {
        if secs > 0.0 && secs.is_finite() {
            Some(Duration::from_secs_f64(secs))
        } else {
            None
        }
    }
}

/// Outcome of an optimisation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    /// Parameters of the best completed trial.
    pub best_params: Params,
    /// Objective value of the best completed trial.
    pub best_value: f64,
    /// Number of the best completed trial.
    pub best_trial: usize,
    /// Number of completed trials.
    pub n_complete: usize,
    /// Number of failed trials.
    pub n_failed: usize,
    /// Every trial in trial order.
    pub trials: Vec<TrialRecord>,
}

/// Mean over replicates of the last action's value for `metric_name`.
///
/// Replicates whose last action lacks the metric (or that are empty) are left
/// out of the average. When no replicate contributes, the objective is
/// undefined and an `objective-no-data` error is returned.
pub fn to_objective(metric_name: &str, results: &SimulationResult) -> Result<f64, FlowError> {
    let values: Vec<f64> = results
        .iter()
        .filter_map(|replicate| replicate.last())
        .filter_map(|action| action.metric.get(metric_name).copied())
        .collect();
    if values.is_empty() {
        return Err(FlowError::Objective(
            ErrorInfo::new("objective-no-data", "no data for metric")
                .with_context("metric", metric_name)
                .with_context("replicates", results.len().to_string()),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Drives trials of a [`Study`] through the [`Simulator`].
#[derive(Clone, Copy)]
pub struct Optimizer<'a> {
    scenarios: &'a dyn ScenarioLoader,
    actors: &'a dyn ActorLoader,
    suggestions: &'a dyn SuggestionLoader,
}

impl<'a> Optimizer<'a> {
    /// Creates an optimizer over the given loaders.
    pub fn new(
        scenarios: &'a dyn ScenarioLoader,
        actors: &'a dyn ActorLoader,
        suggestions: &'a dyn SuggestionLoader,
    ) -> Self {
        Self {
            scenarios,
            actors,
            suggestions,
        }
    }

    /// Searches the actor's suggestion space, one single-replicate simulation per trial.
    pub fn optimize(
        &self,
        scenario_name: &str,
        actor_name: &str,
        opts: &OptimizeOpts,
    ) -> Result<StudySummary, FlowError> {
        let suggester = Suggester::new(self.suggestions.load(actor_name)?);
        let simulator = Simulator::new(self.scenarios, self.actors);
        let mut study = Study::new(opts.direction, opts.seed);
        let started = Instant::now();

        for _ in 0..opts.n_trials {
            if let Some(timeout) = opts.timeout {
                if started.elapsed() >= timeout {
                    info!(
                        actor = actor_name,
                        trials = study.trials().len(),
                        "optimisation timeout reached"
                    );
                    break;
                }
            }

            let mut trial = study.ask();
            let params = suggester.suggest(&mut trial)?;
            let trial_seed = derive_substream_seed(opts.seed, trial.number() as u64);
            let outcome = simulator
                .run(1, scenario_name, actor_name, &params, &mut [], trial_seed)
                .and_then(|results| to_objective(&opts.metric, &results))
                .and_then(|value| finite_objective(&opts.metric, value));

            match outcome {
                Ok(value) => {
                    let record = study.tell(trial, value);
                    debug!(
                        actor = actor_name,
                        trial = record.number,
                        value,
                        "trial complete"
                    );
                }
                Err(err)
                    if is_trial_failure(&err)
                        && opts.on_trial_error == TrialFailurePolicy::Skip =>
                {
                    warn!(actor = actor_name, trial = trial.number(), error = %err, "trial failed");
                    study.fail(trial, &err);
                }
                Err(err) => return Err(err),
            }
        }

        summarize(&study, actor_name)
    }
}

fn finite_objective(metric_name: &str, value: f64) -> Result<f64, FlowError> {
    if value.is_finite() {
        return Ok(value);
    }
    Err(FlowError::Objective(
        ErrorInfo::new("objective-not-finite", "objective is not a finite number")
            .with_context("metric", metric_name)
            .with_context("value", value.to_string()),
    ))
}

fn is_trial_failure(err: &FlowError) -> bool {
    matches!(err, FlowError::Objective(_) | FlowError::Simulation(_))
}

fn summarize(study: &Study, actor_name: &str) -> Result<StudySummary, FlowError> {
    let best = study.best_trial().ok_or_else(|| {
        FlowError::Trial(
            ErrorInfo::new(
                "no-completed-trials",
                "optimisation finished without a completed trial",
            )
            .with_context("actor", actor_name)
            .with_context("trials", study.trials().len().to_string()),
        )
    })?;
    let n_failed = study
        .trials()
        .iter()
        .filter(|record| record.state == TrialState::Failed)
        .count();
    let summary = StudySummary {
        best_params: best.params.clone(),
        best_value: best.value.unwrap_or_default(),
        best_trial: best.number,
        n_complete: study.trials().len() - n_failed,
        n_failed,
        trials: study.trials().to_vec(),
    };
    info!(
        actor = actor_name,
        best_trial = summary.best_trial,
        best_value = summary.best_value,
        complete = summary.n_complete,
        failed = summary.n_failed,
        "optimisation finished"
    );
    Ok(summary)
}

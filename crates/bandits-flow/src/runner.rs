use bandits_core::errors::FlowError;
use bandits_core::{Params, SimulationResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::history::HistoryStore;
use crate::optimizer::{OptimizeOpts, Optimizer, StudySummary};
use crate::registry::Loaders;
use crate::simulator::{replay_callbacks, ActionCallback, Simulator};

/// Per-actor overrides forcing recomputation despite a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevivalFlags {
    /// Recompute the optimize stage.
    pub optimize: bool,
    /// Recompute the evaluate stage.
    pub evaluate: bool,
}

/// Whether a stage reuses its cached value or computes a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    /// Use the cached value verbatim.
    Reuse,
    /// Run the stage from scratch.
    Compute,
}

/// Optimize stage: reuse only when a cached value exists and revival is off.
pub fn optimize_decision(cached: bool, revival: bool) -> StageDecision {
    if cached && !revival {
        StageDecision::Reuse
    } else {
        StageDecision::Compute
    }
}

/// Evaluate stage: a recomputed optimize stage forces recomputation here too.
pub fn evaluate_decision(cached: bool, revival: bool, during_revival: bool) -> StageDecision {
    optimize_decision(cached, revival || during_revival)
}

/// Options of the evaluate stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluateOpts {
    /// Number of replicates.
    pub n_iterations: usize,
    /// Base seed; replicate `i` uses `seed + i`.
    pub seed: u64,
    /// When false no callback fires, neither live nor on cached replay.
    pub save_metrics: bool,
}

/// Result of the optimize stage.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOutcome {
    /// Parameters handed to the evaluate stage.
    pub best_params: Params,
    /// True when the parameters were freshly computed.
    pub during_revival: bool,
    /// Study details, present only when the optimizer ran.
    pub summary: Option<StudySummary>,
}

/// Result of the evaluate stage.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateOutcome {
    /// Evaluation output.
    pub result: SimulationResult,
    /// True when the simulator ran instead of reusing the cache.
    pub recomputed: bool,
}

/// Caching/revival policy for one scenario/actor pair.
pub struct Runner<'a> {
    scenario_name: &'a str,
    actor_name: &'a str,
    loaders: &'a Loaders,
    history: &'a dyn HistoryStore,
}

impl<'a> Runner<'a> {
    /// Creates a runner for `actor_name` on `scenario_name`.
    pub fn new(
        scenario_name: &'a str,
        actor_name: &'a str,
        loaders: &'a Loaders,
        history: &'a dyn HistoryStore,
    ) -> Self {
        Self {
            scenario_name,
            actor_name,
            loaders,
            history,
        }
    }

    /// Returns cached best parameters or runs the optimizer.
    pub fn optimize(
        &self,
        opts: &OptimizeOpts,
        revival: bool,
    ) -> Result<OptimizeOutcome, FlowError> {
        let cached = self
            .history
            .latest_best_params(self.scenario_name, self.actor_name)?;
        let decision = optimize_decision(cached.is_some(), revival);
        info!(
            scenario = self.scenario_name,
            actor = self.actor_name,
            cache_hit = cached.is_some(),
            revival,
            decision = ?decision,
            "optimize stage"
        );

        match (decision, cached) {
            (StageDecision::Reuse, Some(best_params)) => Ok(OptimizeOutcome {
                best_params,
                during_revival: false,
                summary: None,
            }),
            _ => {
                let optimizer = Optimizer::new(
                    self.loaders.scenarios.as_ref(),
                    self.loaders.actors.as_ref(),
                    self.loaders.suggestions.as_ref(),
                );
                let summary = optimizer.optimize(self.scenario_name, self.actor_name, opts)?;
                Ok(OptimizeOutcome {
                    best_params: summary.best_params.clone(),
                    during_revival: true,
                    summary: Some(summary),
                })
            }
        }
    }

    /// Returns the cached evaluation (replaying it through `callbacks`) or simulates afresh.
    pub fn evaluate(
        &self,
        params: &Params,
        opts: &EvaluateOpts,
        callbacks: &mut [ActionCallback<'_>],
        revival: bool,
        during_revival: bool,
    ) -> Result<EvaluateOutcome, FlowError> {
        let cached = self.history.latest_result(self.scenario_name, self.actor_name)?;
        let decision = evaluate_decision(cached.is_some(), revival, during_revival);
        info!(
            scenario = self.scenario_name,
            actor = self.actor_name,
            cache_hit = cached.is_some(),
            revival,
            during_revival,
            decision = ?decision,
            "evaluate stage"
        );

        let callbacks: &mut [ActionCallback<'_>] = if opts.save_metrics {
            callbacks
        } else {
            &mut []
        };

        match (decision, cached) {
            (StageDecision::Reuse, Some(result)) => {
                replay_callbacks(&result, callbacks)?;
                Ok(EvaluateOutcome {
                    result,
                    recomputed: false,
                })
            }
            _ => {
                let simulator =
                    Simulator::new(self.loaders.scenarios.as_ref(), self.loaders.actors.as_ref());
                let result = simulator.run(
                    opts.n_iterations,
                    self.scenario_name,
                    self.actor_name,
                    params,
                    callbacks,
                    opts.seed,
                )?;
                Ok(EvaluateOutcome {
                    result,
                    recomputed: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimize_table() {
        assert_eq!(optimize_decision(false, false), StageDecision::Compute);
        assert_eq!(optimize_decision(false, true), StageDecision::Compute);
        assert_eq!(optimize_decision(true, false), StageDecision::Reuse);
        assert_eq!(optimize_decision(true, true), StageDecision::Compute);
    }

    #[test]
    fn evaluate_cascades_from_optimize() {
        assert_eq!(evaluate_decision(true, false, false), StageDecision::Reuse);
        assert_eq!(evaluate_decision(true, false, true), StageDecision::Compute);
        assert_eq!(evaluate_decision(true, true, false), StageDecision::Compute);
        assert_eq!(evaluate_decision(false, false, false), StageDecision::Compute);
    }
}

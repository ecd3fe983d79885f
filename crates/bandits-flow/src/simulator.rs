use bandits_core::errors::FlowError;
use bandits_core::{
    replicate_seed, Action, ActorLoader, Params, Replicate, ScenarioLoader, SimulationResult,
};
use tracing::debug;

/// Observer invoked with `(iteration, step, action)` for every produced action.
///
/// A failing callback aborts the replicate it observes.
pub type ActionCallback<'a> = Box<dyn FnMut(usize, usize, &Action) -> Result<(), FlowError> + 'a>;

/// Runs seeded replicates of an actor against a scenario.
#[derive(Clone, Copy)]
pub struct Simulator<'a> {
    scenarios: &'a dyn ScenarioLoader,
    actors: &'a dyn ActorLoader,
}

impl<'a> Simulator<'a> {
    /// Creates a simulator resolving collaborators through the given loaders.
    pub fn new(scenarios: &'a dyn ScenarioLoader, actors: &'a dyn ActorLoader) -> Self {
        Self { scenarios, actors }
    }

    /// Runs `n_iterations` independent replicates; replicate `i` is seeded with `seed + i`.
    pub fn run(
        &self,
        n_iterations: usize,
        scenario_name: &str,
        actor_name: &str,
        params: &Params,
        callbacks: &mut [ActionCallback<'_>],
        seed: u64,
    ) -> Result<SimulationResult, FlowError> {
        let mut results = Vec::with_capacity(n_iterations);
        for iteration in 0..n_iterations {
            let replicate = self.run_replicate(
                iteration,
                scenario_name,
                actor_name,
                params,
                callbacks,
                replicate_seed(seed, iteration),
            )?;
            results.push(replicate);
        }
        Ok(results)
    }

    /// Runs one replicate with fresh scenario and actor instances built from `seed`.
    pub fn run_replicate(
        &self,
        iteration: usize,
        scenario_name: &str,
        actor_name: &str,
        params: &Params,
        callbacks: &mut [ActionCallback<'_>],
        seed: u64,
    ) -> Result<Replicate, FlowError> {
        let mut scenario = self.scenarios.load(scenario_name, seed)?;
        let mut actor = self.actors.load(actor_name, params, seed)?;

        let mut replicate = Vec::new();
        while scenario.scan() {
            let line = scenario.line();
            let action = actor.act(&line)?;
            for callback in callbacks.iter_mut() {
                callback(iteration, replicate.len(), &action)?;
            }
            replicate.push(action);
        }
        debug!(
            iteration,
            seed,
            steps = replicate.len(),
            actor = actor_name,
            "replicate finished"
        );
        Ok(replicate)
    }
}

/// Feeds an existing result through the callbacks in `(iteration, step)` order.
pub fn replay_callbacks(
    result: &SimulationResult,
    callbacks: &mut [ActionCallback<'_>],
) -> Result<(), FlowError> {
    if callbacks.is_empty() {
        return Ok(());
    }
    for (iteration, replicate) in result.iter().enumerate() {
        for (step, action) in replicate.iter().enumerate() {
            for callback in callbacks.iter_mut() {
                callback(iteration, step, action)?;
            }
        }
    }
    Ok(())
}

#![deny(missing_docs)]
#![doc = "Bernoulli bandit collaborators wired into banditsflow registries."]

/// Policies and the bandit actor.
pub mod actors;
/// Summary reporter.
pub mod reporter;
/// Bernoulli bandit scenario.
pub mod scenario;

use std::path::Path;
use std::sync::Arc;

use bandits_core::Scenario;
use bandits_flow::{
    ActorRegistry, Loaders, Reporter, ReporterRegistry, ScenarioRegistry, YamlSuggestionLoader,
};

pub use actors::{epsilon_greedy, softmax, ucb1, BanditActor, EpsilonGreedy, Policy, Softmax, Ucb1};
pub use reporter::{mean_final_metric, SummaryReporter, SummaryRow};
pub use scenario::{BernoulliScenario, BernoulliSpec};

/// Built-in scenarios: `bernoulli` (three well separated arms, 200 rounds)
/// and `bernoulli_hard` (five close arms, 500 rounds).
pub fn builtin_scenarios() -> Vec<(&'static str, BernoulliSpec)> {
    vec![
        (
            "bernoulli",
            BernoulliSpec {
                probs: vec![0.2, 0.5, 0.8],
                horizon: 200,
            },
        ),
        (
            "bernoulli_hard",
            BernoulliSpec {
                probs: vec![0.45, 0.5, 0.55, 0.48, 0.52],
                horizon: 500,
            },
        ),
    ]
}

/// Registry holding [`builtin_scenarios`].
pub fn scenario_registry() -> ScenarioRegistry {
    let mut registry = ScenarioRegistry::new();
    for (name, spec) in builtin_scenarios() {
        registry.register(name, move |seed| {
            Ok(Box::new(BernoulliScenario::new(spec.clone(), seed)?) as Box<dyn Scenario>)
        });
    }
    registry
}

/// Registry holding `epsilon_greedy`, `ucb1` and `softmax`.
pub fn actor_registry() -> ActorRegistry {
    let mut registry = ActorRegistry::new();
    registry
        .register("epsilon_greedy", epsilon_greedy)
        .register("ucb1", ucb1)
        .register("softmax", softmax);
    registry
}

/// Registry holding the `summary` reporter.
pub fn reporter_registry() -> ReporterRegistry {
    let mut registry = ReporterRegistry::new();
    registry.register("summary", |dir: &Path| {
        Ok(Box::new(SummaryReporter::new(dir)) as Box<dyn Reporter>)
    });
    registry
}

/// Demo loaders reading suggestion lists from `suggestion_dir`.
pub fn demo_loaders(suggestion_dir: &Path) -> Loaders {
    Loaders::new(
        Arc::new(scenario_registry()),
        Arc::new(actor_registry()),
        Arc::new(YamlSuggestionLoader::new(suggestion_dir)),
    )
}

/// Directory of the suggestion lists shipped with this crate.
pub fn bundled_suggestion_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/suggestions"))
}

#![deny(missing_docs)]
#![doc = "Simulation, hyperparameter search and cross-run revival policy for bandit experiments."]

/// YAML flow configuration.
pub mod config;
/// Per-actor fan-out, report and history commit.
pub mod flow;
/// Canonical hashing helpers.
pub mod hash;
/// Cached results of prior runs.
pub mod history;
/// Trial loop and objective reduction.
pub mod optimizer;
/// Name-to-factory registries.
pub mod registry;
/// Reporter collaborator traits.
pub mod reporter;
/// Optimize/evaluate caching and revival decisions.
pub mod runner;
/// Canonical JSON and YAML serde helpers.
pub mod serde;
/// Replicate simulation loop.
pub mod simulator;
/// Metrics sinks fed by simulator callbacks.
pub mod sink;
/// Seeded random-search study.
pub mod study;
/// Search-space suggestions and the trial contract.
pub mod suggestion;

pub use config::{
    load_config, parse_config, EvaluateConfig, FlowConfig, OptimizeConfig, RevivalConfig,
};
pub use flow::{run_actor, run_flow, ActorOutcome, FlowReport};
pub use hash::stable_hash_string;
pub use history::{ActorRecord, FileHistory, HistoryStore, InMemoryHistory, RunState, RunStatus};
pub use optimizer::{to_objective, OptimizeOpts, Optimizer, StudySummary, TrialFailurePolicy};
pub use registry::{ActorRegistry, Loaders, Registry, ReporterRegistry, ScenarioRegistry};
pub use reporter::{Reporter, ReporterLoader};
pub use runner::{
    evaluate_decision, optimize_decision, EvaluateOpts, EvaluateOutcome, OptimizeOutcome,
    RevivalFlags, Runner, StageDecision,
};
pub use simulator::{replay_callbacks, ActionCallback, Simulator};
pub use sink::{sink_callback, JsonlMetricsSink, MetricsSink, NullMetricsSink, TracingMetricsSink};
pub use study::{Direction, RandomTrial, Study, TrialRecord, TrialState};
pub use suggestion::{
    validate_suggestions, StaticSuggestionLoader, Suggester, Suggestion, SuggestionLoader, Trial,
    YamlSuggestionLoader,
};

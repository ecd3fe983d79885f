use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use bandits_core::errors::{ErrorInfo, FlowError};
use serde::{Deserialize, Serialize};

use crate::optimizer::{OptimizeOpts, TrialFailurePolicy};
use crate::runner::{EvaluateOpts, RevivalFlags};
use crate::serde::from_yaml_slice;
use crate::study::Direction;

/// YAML flow configuration: one scenario, many actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Experiment identity; namespaces the history store.
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
    /// Scenario every actor is run against.
    pub scenario: String,
    /// Actors to tune and evaluate, one parallel branch each.
    pub actors: Vec<String>,
    /// Optional reporter run after every branch joined.
    #[serde(default)]
    pub reporter: Option<String>,
    /// Optimize stage settings.
    #[serde(default)]
    pub optimize: OptimizeConfig,
    /// Evaluate stage settings.
    #[serde(default)]
    pub evaluate: EvaluateConfig,
    /// Actors whose cached stages are ignored.
    #[serde(default)]
    pub revival: RevivalConfig,
    /// Worker threads used for the actor fan-out (0 = one per actor).
    #[serde(default)]
    pub concurrency: usize,
    /// Reporter and metrics output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Root of the file-backed history store.
    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,
    /// Directory holding `<actor>.yml` suggestion lists.
    #[serde(default = "default_suggestion_dir")]
    pub suggestion_dir: PathBuf,
}

fn default_experiment_name() -> String {
    "default".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("history")
}

fn default_suggestion_dir() -> PathBuf {
    PathBuf::from("suggestions")
}

/// Optimize stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeConfig {
    /// Trial budget.
    #[serde(default = "default_n_trials")]
    pub n_trials: usize,
    /// Wall-clock budget in seconds; `<= 0` is unbounded.
    #[serde(default)]
    pub timeout_secs: f64,
    /// Objective direction.
    #[serde(default)]
    pub direction: Direction,
    /// Metric reduced into the objective.
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Search seed.
    #[serde(default)]
    pub seed: u64,
    /// Failed-trial policy.
    #[serde(default)]
    pub on_trial_error: TrialFailurePolicy,
}

fn default_n_trials() -> usize {
    20
}

fn default_metric() -> String {
    "cum_reward".to_string()
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            n_trials: default_n_trials(),
            timeout_secs: 0.0,
            direction: Direction::default(),
            metric: default_metric(),
            seed: 0,
            on_trial_error: TrialFailurePolicy::default(),
        }
    }
}

impl OptimizeConfig {
    /// Runtime options of the optimize stage.
    pub fn to_opts(&self) -> OptimizeOpts {
        OptimizeOpts {
            n_trials: self.n_trials,
            timeout: OptimizeOpts::timeout_from_secs(self.timeout_secs),
            direction: self.direction,
            metric: self.metric.clone(),
            seed: self.seed,
            on_trial_error: self.on_trial_error,
        }
    }
}

/// Evaluate stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluateConfig {
    /// Replicate count.
    #[serde(default = "default_n_iterations")]
    pub n_iterations: usize,
    /// Base seed.
    #[serde(default)]
    pub seed: u64,
    /// Whether actions are forwarded to the metrics sink.
    #[serde(default = "default_save_metrics")]
    pub save_metrics: bool,
}

fn default_n_iterations() -> usize {
    10
}

fn default_save_metrics() -> bool {
    true
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            n_iterations: default_n_iterations(),
            seed: 0,
            save_metrics: default_save_metrics(),
        }
    }
}

impl EvaluateConfig {
    /// Runtime options of the evaluate stage.
    pub fn to_opts(&self) -> EvaluateOpts {
        EvaluateOpts {
            n_iterations: self.n_iterations,
            seed: self.seed,
            save_metrics: self.save_metrics,
        }
    }
}

/// Actor lists forcing recomputation per stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RevivalConfig {
    /// Actors whose optimize stage is recomputed.
    #[serde(default)]
    pub optimize: Vec<String>,
    /// Actors whose evaluate stage is recomputed.
    #[serde(default)]
    pub evaluate: Vec<String>,
}

impl RevivalConfig {
    /// Flags for one actor.
    pub fn flags_for(&self, actor_name: &str) -> RevivalFlags {
        RevivalFlags {
            optimize: self.optimize.iter().any(|name| name == actor_name),
            evaluate: self.evaluate.iter().any(|name| name == actor_name),
        }
    }
}

impl FlowConfig {
    /// Minimal configuration with defaults for everything else.
    pub fn new(scenario: impl Into<String>, actors: Vec<String>) -> Self {
        Self {
            experiment_name: default_experiment_name(),
            scenario: scenario.into(),
            actors,
            reporter: None,
            optimize: OptimizeConfig::default(),
            evaluate: EvaluateConfig::default(),
            revival: RevivalConfig::default(),
            concurrency: 0,
            output_dir: default_output_dir(),
            history_dir: default_history_dir(),
            suggestion_dir: default_suggestion_dir(),
        }
    }

    /// Checks invariants the stages rely on.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.scenario.trim().is_empty() {
            return Err(invalid("config-scenario", "scenario name must not be empty"));
        }
        if self.actors.is_empty() {
            return Err(invalid("config-actors", "at least one actor is required"));
        }
        let mut seen = BTreeSet::new();
        for actor in &self.actors {
            if !seen.insert(actor.as_str()) {
                return Err(FlowError::Config(
                    ErrorInfo::new("config-actors", "actor names must be unique")
                        .with_context("actor", actor.as_str()),
                ));
            }
            if !is_path_safe(actor) {
                return Err(FlowError::Config(
                    ErrorInfo::new("config-actor-name", "actor name is not a plain file name")
                        .with_context("actor", actor.as_str()),
                ));
            }
        }
        if !is_path_safe(&self.experiment_name) || !is_path_safe(&self.scenario) {
            return Err(invalid(
                "config-name",
                "experiment and scenario names must be plain file names",
            ));
        }
        if self.evaluate.n_iterations == 0 {
            return Err(invalid("config-iterations", "evaluate.n_iterations must be positive"));
        }
        if self.optimize.n_trials == 0 {
            return Err(invalid("config-trials", "optimize.n_trials must be positive"));
        }
        for name in self.revival.optimize.iter().chain(&self.revival.evaluate) {
            if !self.actors.contains(name) {
                return Err(FlowError::Config(
                    ErrorInfo::new("config-revival", "revival lists an unknown actor")
                        .with_context("actor", name.as_str()),
                ));
            }
        }
        Ok(())
    }

    fn resolve_dirs(&mut self, base: &Path) {
        for dir in [
            &mut self.output_dir,
            &mut self.history_dir,
            &mut self.suggestion_dir,
        ] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}

fn is_path_safe(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

fn invalid(code: &str, message: &str) -> FlowError {
    FlowError::Config(ErrorInfo::new(code, message))
}

/// Parses a YAML flow configuration without touching the filesystem.
pub fn parse_config(bytes: &[u8]) -> Result<FlowConfig, FlowError> {
    let config: FlowConfig = from_yaml_slice(bytes).map_err(|err| {
        FlowError::Config(ErrorInfo::new("config-parse", err.info().message.clone()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads, resolves and validates a YAML flow configuration.
///
/// Relative directories are resolved against the file's parent directory.
pub fn load_config(path: impl AsRef<Path>) -> Result<FlowConfig, FlowError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| {
        FlowError::Config(
            ErrorInfo::new("config-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let mut config = parse_config(&bytes)?;
    let base = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    config.resolve_dirs(&base);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = parse_config(b"scenario: bernoulli\nactors: [ucb1]\n").expect("parse");
        assert_eq!(config.experiment_name, "default");
        assert_eq!(config.optimize.n_trials, 20);
        assert_eq!(config.optimize.to_opts().timeout, None);
        assert!(config.evaluate.save_metrics);
        assert_eq!(config.revival.flags_for("ucb1"), RevivalFlags::default());
    }

    #[test]
    fn rejects_duplicate_and_unsafe_actor_names() {
        let err = parse_config(b"scenario: s\nactors: [a, a]\n").unwrap_err();
        assert_eq!(err.code(), "config-actors");
        let err = parse_config(b"scenario: s\nactors: ['../a']\n").unwrap_err();
        assert_eq!(err.code(), "config-actor-name");
    }

    #[test]
    fn revival_must_name_configured_actors() {
        let yaml = b"scenario: s\nactors: [a]\nrevival:\n  evaluate: [b]\n";
        assert_eq!(parse_config(yaml).unwrap_err().code(), "config-revival");
    }
}

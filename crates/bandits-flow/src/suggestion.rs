use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{ParamValue, Params};
use serde::{Deserialize, Serialize};

use crate::serde::from_yaml_slice;

/// Declarative search space for one tunable parameter.
///
/// The `type` tag selects the variant; an unknown tag fails deserialization,
/// so a suggestion list never silently drops an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Suggestion {
    /// One of an ordered list of candidate scalars.
    Categorical {
        /// Parameter name.
        name: String,
        /// Candidate values.
        choices: Vec<ParamValue>,
    },
    /// Float on the uniform grid `low, low + q, ..., high`.
    DiscreteUniform {
        /// Parameter name.
        name: String,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
        /// Grid step.
        q: f64,
    },
    /// Float in `[low, high]`, optionally stepped or log-scaled.
    Float {
        /// Parameter name.
        name: String,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
        /// Optional grid step.
        #[serde(default)]
        step: Option<f64>,
        /// Sample in log space.
        #[serde(default)]
        log: bool,
    },
    /// Integer in `[low, high]`.
    Int {
        /// Parameter name.
        name: String,
        /// Lower bound.
        low: i64,
        /// Upper bound.
        high: i64,
        /// Grid step.
        #[serde(default = "default_int_step")]
        step: i64,
        /// Sample in log space.
        #[serde(default)]
        log: bool,
    },
    /// Float in `[low, high]` sampled in log space.
    #[serde(rename = "loguniform")]
    LogUniform {
        /// Parameter name.
        name: String,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Float in `[low, high]` sampled linearly.
    Uniform {
        /// Parameter name.
        name: String,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

fn default_int_step() -> i64 {
    1
}

impl Suggestion {
    /// Name of the parameter described by the suggestion.
    pub fn name(&self) -> &str {
        match self {
            Suggestion::Categorical { name, .. }
            | Suggestion::DiscreteUniform { name, .. }
            | Suggestion::Float { name, .. }
            | Suggestion::Int { name, .. }
            | Suggestion::LogUniform { name, .. }
            | Suggestion::Uniform { name, .. } => name,
        }
    }
}

/// Per-trial context of a black-box search algorithm.
///
/// Implementations own the sampling policy and enforce range semantics; every
/// call yields exactly one scalar for the named parameter.
pub trait Trial {
    /// Picks one of `choices`.
    fn suggest_categorical(
        &mut self,
        name: &str,
        choices: &[ParamValue],
    ) -> Result<ParamValue, FlowError>;

    /// Picks a float on the grid `low + k * q` within `[low, high]`.
    fn suggest_discrete_uniform(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        q: f64,
    ) -> Result<f64, FlowError>;

    /// Picks a float within `[low, high]`.
    fn suggest_float(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        step: Option<f64>,
        log: bool,
    ) -> Result<f64, FlowError>;

    /// Picks an integer within `[low, high]`.
    fn suggest_int(
        &mut self,
        name: &str,
        low: i64,
        high: i64,
        step: i64,
        log: bool,
    ) -> Result<i64, FlowError>;

    /// Picks a float within `[low, high]` in log space.
    fn suggest_loguniform(&mut self, name: &str, low: f64, high: f64) -> Result<f64, FlowError>;

    /// Picks a float within `[low, high]` linearly.
    fn suggest_uniform(&mut self, name: &str, low: f64, high: f64) -> Result<f64, FlowError>;
}

/// Translates a suggestion list into concrete parameters through a [`Trial`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Suggester {
    suggestions: Vec<Suggestion>,
}

impl Suggester {
    /// Creates a suggester over the provided list.
    pub fn new(suggestions: Vec<Suggestion>) -> Self {
        Self { suggestions }
    }

    /// Suggestions in list order.
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Asks the trial for one value per suggestion, in list order.
    ///
    /// A later suggestion with the same name overwrites the earlier value.
    pub fn suggest(&self, trial: &mut dyn Trial) -> Result<Params, FlowError> {
        let mut params = Params::new();
        for suggestion in &self.suggestions {
            let value = match suggestion {
                Suggestion::Categorical { name, choices } => {
                    trial.suggest_categorical(name, choices)?
                }
                Suggestion::DiscreteUniform { name, low, high, q } => {
                    ParamValue::Float(trial.suggest_discrete_uniform(name, *low, *high, *q)?)
                }
                Suggestion::Float {
                    name,
                    low,
                    high,
                    step,
                    log,
                } => ParamValue::Float(trial.suggest_float(name, *low, *high, *step, *log)?),
                Suggestion::Int {
                    name,
                    low,
                    high,
                    step,
                    log,
                } => ParamValue::Int(trial.suggest_int(name, *low, *high, *step, *log)?),
                Suggestion::LogUniform { name, low, high } => {
                    ParamValue::Float(trial.suggest_loguniform(name, *low, *high)?)
                }
                Suggestion::Uniform { name, low, high } => {
                    ParamValue::Float(trial.suggest_uniform(name, *low, *high)?)
                }
            };
            params.insert(suggestion.name().to_string(), value);
        }
        Ok(params)
    }
}

/// Resolves an actor name into its suggestion list.
pub trait SuggestionLoader: Send + Sync {
    /// Loads the ordered suggestion list for `actor_name`.
    fn load(&self, actor_name: &str) -> Result<Vec<Suggestion>, FlowError>;
}

/// Rejects suggestion lists that reuse a parameter name.
pub fn validate_suggestions(actor_name: &str, suggestions: &[Suggestion]) -> Result<(), FlowError> {
    let mut seen = BTreeSet::new();
    for suggestion in suggestions {
        if !seen.insert(suggestion.name()) {
            return Err(FlowError::Config(
                ErrorInfo::new(
                    "suggestion-duplicate-name",
                    "suggestion names must be unique within a list",
                )
                .with_context("actor", actor_name)
                .with_context("name", suggestion.name()),
            ));
        }
    }
    Ok(())
}

/// Reads `<dir>/<actor>.yml` (or `.yaml`) holding a YAML sequence of suggestions.
#[derive(Debug, Clone)]
pub struct YamlSuggestionLoader {
    dir: PathBuf,
}

impl YamlSuggestionLoader {
    /// Creates a loader rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve_path(&self, actor_name: &str) -> Option<PathBuf> {
        ["yml", "yaml"]
            .iter()
            .map(|ext| self.dir.join(format!("{actor_name}.{ext}")))
            .find(|path| path.is_file())
    }
}

impl SuggestionLoader for YamlSuggestionLoader {
    fn load(&self, actor_name: &str) -> Result<Vec<Suggestion>, FlowError> {
        let path = self.resolve_path(actor_name).ok_or_else(|| {
            FlowError::Resolve(
                ErrorInfo::new("unknown-suggestions", "no suggestion file for actor")
                    .with_context("actor", actor_name)
                    .with_context("dir", self.dir.display().to_string()),
            )
        })?;
        let suggestions = read_suggestion_file(&path)?;
        validate_suggestions(actor_name, &suggestions)?;
        Ok(suggestions)
    }
}

fn read_suggestion_file(path: &Path) -> Result<Vec<Suggestion>, FlowError> {
    let bytes = fs::read(path).map_err(|err| {
        FlowError::Config(
            ErrorInfo::new("suggestion-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    from_yaml_slice(&bytes).map_err(|err| {
        FlowError::Config(
            ErrorInfo::new("suggestion-parse", err.info().message.clone())
                .with_context("path", path.display().to_string())
                .with_hint("each entry needs `name` and a known `type` tag"),
        )
    })
}

/// In-memory suggestion lists keyed by actor name.
#[derive(Debug, Clone, Default)]
pub struct StaticSuggestionLoader {
    lists: BTreeMap<String, Vec<Suggestion>>,
}

impl StaticSuggestionLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the suggestion list used for `actor_name`.
    pub fn with(mut self, actor_name: impl Into<String>, suggestions: Vec<Suggestion>) -> Self {
        self.lists.insert(actor_name.into(), suggestions);
        self
    }
}

impl SuggestionLoader for StaticSuggestionLoader {
    fn load(&self, actor_name: &str) -> Result<Vec<Suggestion>, FlowError> {
        let suggestions = self.lists.get(actor_name).cloned().ok_or_else(|| {
            FlowError::Resolve(
                ErrorInfo::new("unknown-suggestions", "no suggestion list for actor")
                    .with_context("actor", actor_name),
            )
        })?;
        validate_suggestions(actor_name, &suggestions)?;
        Ok(suggestions)
    }
}

//! Name-to-factory registries implementing the loader traits.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{Actor, ActorLoader, Params, Scenario, ScenarioLoader};

use crate::reporter::{Reporter, ReporterLoader};
use crate::suggestion::SuggestionLoader;

/// Builds a scenario from its seed.
pub type ScenarioFactory = dyn Fn(u64) -> Result<Box<dyn Scenario>, FlowError> + Send + Sync;
/// Builds an actor from its parameters and seed.
pub type ActorFactory = dyn Fn(&Params, u64) -> Result<Box<dyn Actor>, FlowError> + Send + Sync;
/// Builds a reporter writing under an output directory.
pub type ReporterFactory = dyn Fn(&Path) -> Result<Box<dyn Reporter>, FlowError> + Send + Sync;

/// Named factories of one collaborator kind.
pub struct Registry<F: ?Sized> {
    kind: &'static str,
    entries: BTreeMap<String, Box<F>>,
}

impl<F: ?Sized> Registry<F> {
    fn with_kind(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Returns true when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn resolve(&self, name: &str) -> Result<&F, FlowError> {
        self.entries.get(name).map(Box::as_ref).ok_or_else(|| {
            FlowError::Resolve(
                ErrorInfo::new(
                    format!("unknown-{}", self.kind),
                    format!("unknown {} name", self.kind),
                )
                .with_context("name", name)
                .with_hint(format!("known: {}", self.names().join(", "))),
            )
        })
    }
}

/// Scenario factories keyed by name.
pub type ScenarioRegistry = Registry<ScenarioFactory>;
/// Actor factories keyed by name.
pub type ActorRegistry = Registry<ActorFactory>;
/// Reporter factories keyed by name.
pub type ReporterRegistry = Registry<ReporterFactory>;

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::with_kind("scenario")
    }
}

impl ScenarioRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scenario factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(u64) -> Result<Box<dyn Scenario>, FlowError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(factory));
        self
    }
}

impl ScenarioLoader for ScenarioRegistry {
    fn load(&self, name: &str, seed: u64) -> Result<Box<dyn Scenario>, FlowError> {
        (self.resolve(name)?)(seed)
    }
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::with_kind("actor")
    }
}

impl ActorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an actor factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Params, u64) -> Result<Box<dyn Actor>, FlowError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(factory));
        self
    }
}

impl ActorLoader for ActorRegistry {
    fn load(&self, name: &str, params: &Params, seed: u64) -> Result<Box<dyn Actor>, FlowError> {
        (self.resolve(name)?)(params, seed)
    }
}

impl Default for ReporterRegistry {
    fn default() -> Self {
        Self::with_kind("reporter")
    }
}

impl ReporterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reporter factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Path) -> Result<Box<dyn Reporter>, FlowError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(factory));
        self
    }
}

impl ReporterLoader for ReporterRegistry {
    fn load(&self, name: &str, output_dir: &Path) -> Result<Box<dyn Reporter>, FlowError> {
        (self.resolve(name)?)(output_dir)
    }
}

/// Loaders injected into the optimize and evaluate stages.
#[derive(Clone)]
pub struct Loaders {
    /// Scenario resolution.
    pub scenarios: Arc<dyn ScenarioLoader>,
    /// Actor resolution.
    pub actors: Arc<dyn ActorLoader>,
    /// Suggestion list resolution.
    pub suggestions: Arc<dyn SuggestionLoader>,
}

impl Loaders {
    /// Bundles the three loaders.
    pub fn new(
        scenarios: Arc<dyn ScenarioLoader>,
        actors: Arc<dyn ActorLoader>,
        suggestions: Arc<dyn SuggestionLoader>,
    ) -> Self {
        Self {
            scenarios,
            actors,
            suggestions,
        }
    }
}

#![deny(missing_docs)]
#![doc = "Core traits and data types shared by the banditsflow crates."]

pub mod errors;
pub mod provenance;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, FlowError};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, replicate_seed, RngHandle};
pub use types::{Action, Line, ParamValue, Params, Replicate, SimulationResult};

/// Finite, replayable source of event lines.
///
/// A scenario is consumed with a `scan`/`line` cursor: `scan` advances to the
/// next line and reports whether one is available, `line` returns the line the
/// cursor currently points at.
pub trait Scenario {
    /// Advances the cursor, returning false once the scenario is exhausted.
    fn scan(&mut self) -> bool;

    /// Returns the line under the cursor.
    fn line(&self) -> Line;
}

/// Stateful, seeded policy reacting to scenario lines.
pub trait Actor {
    /// Consumes one line and emits the resulting action.
    fn act(&mut self, line: &Line) -> Result<Action, FlowError>;
}

/// Resolves scenario names into fresh scenario instances.
pub trait ScenarioLoader: Send + Sync {
    /// Builds a new scenario instance seeded with `seed`.
    fn load(&self, name: &str, seed: u64) -> Result<Box<dyn Scenario>, FlowError>;
}

/// Resolves actor names into fresh actor instances.
pub trait ActorLoader: Send + Sync {
    /// Builds a new actor instance from its parameters and seed.
    fn load(&self, name: &str, params: &Params, seed: u64) -> Result<Box<dyn Actor>, FlowError>;
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bandits_core::errors::FlowError;
use bandits_core::{Params, SimulationResult};

/// Renders evaluate-stage output into artefacts on disk.
pub trait Reporter {
    /// Writes artefacts for every actor and returns their paths.
    fn report(
        &mut self,
        results: &BTreeMap<String, SimulationResult>,
        best_params: &BTreeMap<String, Params>,
    ) -> Result<Vec<PathBuf>, FlowError>;
}

/// Resolves a reporter name into an instance writing under `output_dir`.
pub trait ReporterLoader: Send + Sync {
    /// Builds the named reporter.
    fn load(&self, name: &str, output_dir: &Path) -> Result<Box<dyn Reporter>, FlowError>;
}

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{Params, SimulationResult};
use bandits_flow::serde::to_canonical_json_bytes;
use bandits_flow::Reporter;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

/// One row of `summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Actor name.
    pub actor: String,
    /// Replicates evaluated.
    pub replicates: usize,
    /// Mean final cumulative reward over replicates that report it.
    pub mean_cum_reward: Option<f64>,
    /// Mean final cumulative regret over replicates that report it.
    pub mean_cum_regret: Option<f64>,
}

/// Mean of the last action's `metric` over replicates that carry it.
pub fn mean_final_metric(result: &SimulationResult, metric: &str) -> Option<f64> {
    let values: Vec<f64> = result
        .iter()
        .filter_map(|replicate| replicate.last())
        .filter_map(|action| action.metric.get(metric).copied())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Writes `summary.csv` and `best_params.json` under its output directory.
#[derive(Debug, Clone)]
pub struct SummaryReporter {
    output_dir: PathBuf,
}

impl SummaryReporter {
    /// Creates a reporter writing under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write_summary(&self, rows: &[SummaryRow]) -> Result<PathBuf, FlowError> {
        let path = self.output_dir.join("summary.csv");
        let file = File::create(&path).map_err(|err| io_error(&path, err))?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(BufWriter::new(file));
        for row in rows {
            writer.serialize(row).map_err(|err| {
                FlowError::Report(
                    ErrorInfo::new("report-csv", err.to_string())
                        .with_context("actor", row.actor.clone()),
                )
            })?;
        }
        writer.flush().map_err(|err| io_error(&path, err))?;
        Ok(path)
    }

    fn write_best_params(
        &self,
        best_params: &BTreeMap<String, Params>,
    ) -> Result<PathBuf, FlowError> {
        let path = self.output_dir.join("best_params.json");
        let bytes = to_canonical_json_bytes(best_params)?;
        fs::write(&path, bytes).map_err(|err| io_error(&path, err))?;
        Ok(path)
    }
}

impl Reporter for SummaryReporter {
    fn report(
        &mut self,
        results: &BTreeMap<String, SimulationResult>,
        best_params: &BTreeMap<String, Params>,
    ) -> Result<Vec<PathBuf>, FlowError> {
        fs::create_dir_all(&self.output_dir).map_err(|err| io_error(&self.output_dir, err))?;
        let rows: Vec<SummaryRow> = results
            .iter()
            .map(|(actor, result)| SummaryRow {
                actor: actor.clone(),
                replicates: result.len(),
                mean_cum_reward: mean_final_metric(result, "cum_reward"),
                mean_cum_regret: mean_final_metric(result, "cum_regret"),
            })
            .collect();
        let artefacts = vec![self.write_summary(&rows)?, self.write_best_params(best_params)?];
        info!(dir = %self.output_dir.display(), actors = rows.len(), "summary written");
        Ok(artefacts)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> FlowError {
    FlowError::Report(
        ErrorInfo::new("report-io", err.to_string())
            .with_context("path", path.display().to_string()),
    )
}

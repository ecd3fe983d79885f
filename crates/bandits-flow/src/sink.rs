use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::Action;
use serde::Serialize;
use tracing::debug;

use crate::simulator::ActionCallback;

/// Receives every action observed by the evaluate stage.
///
/// Sinks never influence control flow beyond failing the replicate they
/// observe. They may see the same logical action again when a cached result
/// is replayed in a later run.
pub trait MetricsSink: Send + Sync {
    /// Records one action.
    fn record(
        &self,
        actor_name: &str,
        iteration: usize,
        step: usize,
        action: &Action,
    ) -> Result<(), FlowError>;

    /// Flushes buffered records.
    fn flush(&self) -> Result<(), FlowError> {
        Ok(())
    }
}

/// Forwards metrics to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record(
        &self,
        actor_name: &str,
        iteration: usize,
        step: usize,
        action: &Action,
    ) -> Result<(), FlowError> {
        debug!(actor = actor_name, iteration, step, metric = ?action.metric, "action");
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record(&self, _: &str, _: usize, _: usize, _: &Action) -> Result<(), FlowError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct MetricLine<'a> {
    actor: &'a str,
    iteration: usize,
    step: usize,
    metric: &'a std::collections::BTreeMap<String, f64>,
}

/// Appends one JSON object per action to a `.jsonl` file.
#[derive(Debug)]
pub struct JsonlMetricsSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlMetricsSink {
    /// Creates (truncating) `path`, including missing parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| sink_error(&path, err))?;
        }
        let file = File::create(&path).map_err(|err| sink_error(&path, err))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonlMetricsSink {
    fn record(
        &self,
        actor_name: &str,
        iteration: usize,
        step: usize,
        action: &Action,
    ) -> Result<(), FlowError> {
        let line = serde_json::to_string(&MetricLine {
            actor: actor_name,
            iteration,
            step,
            metric: &action.metric,
        })
        .map_err(|err| FlowError::Serde(ErrorInfo::new("json-encode", err.to_string())))?;
        let mut writer = self.writer.lock().map_err(|_| {
            FlowError::Simulation(ErrorInfo::new("sink-poisoned", "metrics sink lock poisoned"))
        })?;
        writeln!(writer, "{line}").map_err(|err| sink_error(&self.path, err))
    }

    fn flush(&self) -> Result<(), FlowError> {
        let mut writer = self.writer.lock().map_err(|_| {
            FlowError::Simulation(ErrorInfo::new("sink-poisoned", "metrics sink lock poisoned"))
        })?;
        writer.flush().map_err(|err| sink_error(&self.path, err))
    }
}

fn sink_error(path: &Path, err: std::io::Error) -> FlowError {
    FlowError::Simulation(
        ErrorInfo::new("sink-io", err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Wraps `sink` as a simulator callback tagged with `actor_name`.
pub fn sink_callback<'a>(sink: Arc<dyn MetricsSink>, actor_name: &'a str) -> ActionCallback<'a> {
    Box::new(move |iteration, step, action| sink.record(actor_name, iteration, step, action))
}

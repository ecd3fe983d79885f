use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{Params, RunProvenance, SimulationResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::serde::{from_json_slice, to_canonical_json_bytes};

fn io_error(code: &str, err: impl ToString) -> FlowError {
    FlowError::History(ErrorInfo::new(code, err.to_string()))
}

/// Persisted outcome of one actor within a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    /// Actor name.
    pub actor: String,
    /// Parameters used by the evaluate stage.
    pub best_params: Params,
    /// Evaluate stage output.
    pub result: SimulationResult,
    /// Provenance of the run that produced the record.
    #[serde(default)]
    pub provenance: RunProvenance,
}

/// Lifecycle state of a stored run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    /// Records are still being written.
    Pending,
    /// Every actor record was written.
    Complete,
}

/// Completion marker written after every actor record of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// Lifecycle state.
    pub state: RunState,
    /// Actors recorded in the run.
    pub actors: Vec<String>,
    /// ISO-8601 timestamp of the commit.
    pub created_at: String,
}

/// Lookup service for results of prior successful executions.
///
/// Lookups consult only the latest successful run of the scenario; an actor
/// missing from that run has no cached state.
pub trait HistoryStore: Send + Sync {
    /// Best parameters recorded for the actor by the latest successful run.
    fn latest_best_params(
        &self,
        scenario_name: &str,
        actor_name: &str,
    ) -> Result<Option<Params>, FlowError>;

    /// Evaluate result recorded for the actor by the latest successful run.
    fn latest_result(
        &self,
        scenario_name: &str,
        actor_name: &str,
    ) -> Result<Option<SimulationResult>, FlowError>;

    /// Stores a successful run, returning its identifier.
    fn commit(&self, scenario_name: &str, records: &[ActorRecord]) -> Result<String, FlowError>;
}

#[derive(Debug, Default)]
struct MemoryRuns {
    runs: Vec<(String, String, BTreeMap<String, ActorRecord>)>,
    best_params: BTreeMap<(String, String), Params>,
    results: BTreeMap<(String, String), SimulationResult>,
}

/// History kept in process memory.
///
/// Besides committed runs, best parameters and results can be seeded
/// independently, which makes partial cache states easy to express.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    inner: Mutex<MemoryRuns>,
}

impl InMemoryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds cached best parameters for a scenario/actor pair.
    pub fn with_best_params(mut self, scenario: &str, actor: &str, params: Params) -> Self {
        self.runs_mut()
            .best_params
            .insert((scenario.to_string(), actor.to_string()), params);
        self
    }

    /// Seeds a cached evaluate result for a scenario/actor pair.
    pub fn with_result(mut self, scenario: &str, actor: &str, result: SimulationResult) -> Self {
        self.runs_mut()
            .results
            .insert((scenario.to_string(), actor.to_string()), result);
        self
    }

    /// Number of committed runs.
    pub fn run_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .runs
            .len()
    }

    // Exclusive access needs no lock; a poisoned mutex still holds valid maps.
    fn runs_mut(&mut self) -> &mut MemoryRuns {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryRuns>, FlowError> {
        self.inner.lock().map_err(|_| {
            FlowError::History(ErrorInfo::new("history-poisoned", "history lock poisoned"))
        })
    }
}

impl HistoryStore for InMemoryHistory {
    fn latest_best_params(
        &self,
        scenario_name: &str,
        actor_name: &str,
    ) -> Result<Option<Params>, FlowError> {
        let inner = self.lock()?;
        Ok(inner
            .best_params
            .get(&(scenario_name.to_string(), actor_name.to_string()))
            .cloned())
    }

    fn latest_result(
        &self,
        scenario_name: &str,
        actor_name: &str,
    ) -> Result<Option<SimulationResult>, FlowError> {
        let inner = self.lock()?;
        Ok(inner
            .results
            .get(&(scenario_name.to_string(), actor_name.to_string()))
            .cloned())
    }

    fn commit(&self, scenario_name: &str, records: &[ActorRecord]) -> Result<String, FlowError> {
        let mut inner = self.lock()?;
        let run_id = format!("run-{:04}", inner.runs.len());
        // Only the latest run is visible to lookups.
        inner
            .best_params
            .retain(|(scenario, _), _| scenario != scenario_name);
        inner
            .results
            .retain(|(scenario, _), _| scenario != scenario_name);
        let mut by_actor = BTreeMap::new();
        for record in records {
            let key = (scenario_name.to_string(), record.actor.clone());
            inner.best_params.insert(key.clone(), record.best_params.clone());
            inner.results.insert(key, record.result.clone());
            by_actor.insert(record.actor.clone(), record.clone());
        }
        inner
            .runs
            .push((scenario_name.to_string(), run_id.clone(), by_actor));
        Ok(run_id)
    }
}

/// History persisted as JSON files.
///
/// Layout: `<root>/<experiment>/<scenario>/<run_id>/<actor>.json` plus a
/// `status.json` marker written last. Run identifiers are UTC timestamps, so
/// lexicographic order is chronological.
#[derive(Debug, Clone)]
pub struct FileHistory {
    root: PathBuf,
    experiment: String,
}

impl FileHistory {
    /// Creates a store for `experiment` under `root`.
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            experiment: experiment.into(),
        }
    }

    fn scenario_dir(&self, scenario_name: &str) -> PathBuf {
        self.root.join(&self.experiment).join(scenario_name)
    }

    /// Identifier of the latest complete run of the scenario.
    pub fn latest_run(&self, scenario_name: &str) -> Result<Option<String>, FlowError> {
        let dir = self.scenario_dir(scenario_name);
        if !dir.exists() {
            return Ok(None);
        }
        let mut run_ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|err| io_error("history-list", err))? {
            let entry = entry.map_err(|err| io_error("history-list", err))?;
            if entry.path().is_dir() {
                run_ids.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        run_ids.sort();
        for run_id in run_ids.into_iter().rev() {
            if run_complete(&dir.join(&run_id))? {
                return Ok(Some(run_id));
            }
        }
        Ok(None)
    }

    /// Loads the actor record of the latest complete run, if present.
    pub fn latest_record(
        &self,
        scenario_name: &str,
        actor_name: &str,
    ) -> Result<Option<ActorRecord>, FlowError> {
        let Some(run_id) = self.latest_run(scenario_name)? else {
            return Ok(None);
        };
        let path = self
            .scenario_dir(scenario_name)
            .join(&run_id)
            .join(format!("{actor_name}.json"));
        if !path.exists() {
            debug!(run = %run_id, actor = actor_name, "actor absent from latest run");
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|err| io_error("history-read", err))?;
        let record = from_json_slice(&bytes).map_err(|err| {
            FlowError::History(
                ErrorInfo::new("history-decode", err.info().message.clone())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Ok(Some(record))
    }

    fn allocate_run_dir(&self, scenario_name: &str) -> Result<(String, PathBuf), FlowError> {
        let base = Utc::now().format("%Y%m%dT%H%M%S%.6fZ").to_string();
        let dir = self.scenario_dir(scenario_name);
        let mut run_id = base.clone();
        let mut suffix = 1;
        while dir.join(&run_id).exists() {
            run_id = format!("{base}-{suffix:03}");
            suffix += 1;
        }
        let run_dir = dir.join(&run_id);
        fs::create_dir_all(&run_dir).map_err(|err| io_error("history-mkdir", err))?;
        Ok((run_id, run_dir))
    }
}

impl HistoryStore for FileHistory {
    fn latest_best_params(
        &self,
        scenario_name: &str,
        actor_name: &str,
    ) -> Result<Option<Params>, FlowError> {
        Ok(self
            .latest_record(scenario_name, actor_name)?
            .map(|record| record.best_params))
    }

    fn latest_result(
        &self,
        scenario_name: &str,
        actor_name: &str,
    ) -> Result<Option<SimulationResult>, FlowError> {
        Ok(self
            .latest_record(scenario_name, actor_name)?
            .map(|record| record.result))
    }

    fn commit(&self, scenario_name: &str, records: &[ActorRecord]) -> Result<String, FlowError> {
        let (run_id, run_dir) = self.allocate_run_dir(scenario_name)?;
        let created_at = Utc::now().to_rfc3339();
        write_json(
            &run_dir.join("status.json"),
            &RunStatus {
                state: RunState::Pending,
                actors: Vec::new(),
                created_at: created_at.clone(),
            },
        )?;
        for record in records {
            write_json(&run_dir.join(format!("{}.json", record.actor)), record)?;
        }
        write_json(
            &run_dir.join("status.json"),
            &RunStatus {
                state: RunState::Complete,
                actors: records.iter().map(|record| record.actor.clone()).collect(),
                created_at,
            },
        )?;
        info!(
            run = %run_id,
            scenario = scenario_name,
            actors = records.len(),
            "run committed to history"
        );
        Ok(run_id)
    }
}

fn run_complete(run_dir: &Path) -> Result<bool, FlowError> {
    let status_path = run_dir.join("status.json");
    if !status_path.exists() {
        return Ok(false);
    }
    let bytes = fs::read(&status_path).map_err(|err| io_error("status-read", err))?;
    let status: RunStatus = from_json_slice(&bytes)?;
    Ok(status.state == RunState::Complete)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), FlowError> {
    let bytes = to_canonical_json_bytes(value)?;
    fs::write(path, bytes).map_err(|err| io_error("history-write", err))
}

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{Params, RunProvenance, SchemaVersion, SimulationResult};
use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::FlowConfig;
use crate::hash::stable_hash_string;
use crate::history::{ActorRecord, HistoryStore};
use crate::optimizer::StudySummary;
use crate::registry::Loaders;
use crate::reporter::ReporterLoader;
use crate::runner::{RevivalFlags, Runner};
use crate::sink::{sink_callback, MetricsSink};
use crate::simulator::ActionCallback;

/// Immutable output of one actor branch.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorOutcome {
    /// Actor name.
    pub actor: String,
    /// Parameters used for evaluation.
    pub best_params: Params,
    /// Evaluation output.
    pub result: SimulationResult,
    /// True when the optimize stage ran instead of reusing the cache.
    pub optimized: bool,
    /// True when the evaluate stage ran instead of reusing the cache.
    pub evaluated: bool,
    /// Study details when the optimizer ran.
    pub summary: Option<StudySummary>,
}

/// Summary of a completed flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    /// History run identifier the outcomes were committed under.
    pub run_id: String,
    /// Hash of the flow configuration.
    pub config_hash: String,
    /// Best parameters per actor.
    pub best_params: BTreeMap<String, Params>,
    /// Actors whose optimize stage was recomputed.
    pub optimized: Vec<String>,
    /// Actors whose evaluate stage was recomputed.
    pub evaluated: Vec<String>,
    /// Artefacts written by the reporter.
    pub artefacts: Vec<PathBuf>,
}

/// Runs optimize then evaluate for one actor.
pub fn run_actor(
    config: &FlowConfig,
    actor_name: &str,
    flags: RevivalFlags,
    loaders: &Loaders,
    history: &dyn HistoryStore,
    sink: Option<Arc<dyn MetricsSink>>,
) -> Result<ActorOutcome, FlowError> {
    let runner = Runner::new(&config.scenario, actor_name, loaders, history);
    let optimized = runner.optimize(&config.optimize.to_opts(), flags.optimize)?;

    let mut callbacks: Vec<ActionCallback<'_>> = Vec::new();
    if let Some(sink) = &sink {
        callbacks.push(sink_callback(Arc::clone(sink), actor_name));
    }
    let evaluated = runner.evaluate(
        &optimized.best_params,
        &config.evaluate.to_opts(),
        &mut callbacks,
        flags.evaluate,
        optimized.during_revival,
    )?;
    drop(callbacks);
    if let Some(sink) = &sink {
        sink.flush()?;
    }

    Ok(ActorOutcome {
        actor: actor_name.to_string(),
        best_params: optimized.best_params,
        result: evaluated.result,
        optimized: optimized.during_revival,
        evaluated: evaluated.recomputed,
        summary: optimized.summary,
    })
}

/// start, per-actor optimize/evaluate fan-out, join, report, commit.
///
/// Any branch failure aborts the flow before anything is reported or
/// committed.
pub fn run_flow(
    config: &FlowConfig,
    loaders: &Loaders,
    reporters: &dyn ReporterLoader,
    history: &dyn HistoryStore,
    sink: Option<Arc<dyn MetricsSink>>,
) -> Result<FlowReport, FlowError> {
    config.validate()?;
    let config_hash = stable_hash_string(config)?;
    info!(
        experiment = %config.experiment_name,
        scenario = %config.scenario,
        actors = config.actors.len(),
        config_hash = %config_hash,
        "flow started"
    );

    let threads = if config.concurrency == 0 {
        config.actors.len()
    } else {
        config.concurrency
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|err| FlowError::Config(ErrorInfo::new("thread-pool", err.to_string())))?;

    let outcomes: Vec<ActorOutcome> = pool.install(|| {
        config
            .actors
            .par_iter()
            .map(|actor| {
                run_actor(
                    config,
                    actor,
                    config.revival.flags_for(actor),
                    loaders,
                    history,
                    sink.clone(),
                )
            })
            .collect::<Result<Vec<_>, FlowError>>()
    })?;

    let results: BTreeMap<String, SimulationResult> = outcomes
        .iter()
        .map(|outcome| (outcome.actor.clone(), outcome.result.clone()))
        .collect();
    let best_params: BTreeMap<String, Params> = outcomes
        .iter()
        .map(|outcome| (outcome.actor.clone(), outcome.best_params.clone()))
        .collect();

    let artefacts = match &config.reporter {
        Some(name) => {
            let mut reporter = reporters.load(name, &config.output_dir)?;
            reporter.report(&results, &best_params)?
        }
        None => Vec::new(),
    };

    let provenance = RunProvenance {
        schema: SchemaVersion::default(),
        config_hash: config_hash.clone(),
        optimize_seed: config.optimize.seed,
        evaluate_seed: config.evaluate.seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions: BTreeMap::from([(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )]),
    };
    let records: Vec<ActorRecord> = outcomes
        .iter()
        .map(|outcome| ActorRecord {
            actor: outcome.actor.clone(),
            best_params: outcome.best_params.clone(),
            result: outcome.result.clone(),
            provenance: provenance.clone(),
        })
        .collect();
    let run_id = history.commit(&config.scenario, &records)?;

    let report = FlowReport {
        run_id,
        config_hash,
        best_params,
        optimized: outcomes
            .iter()
            .filter(|outcome| outcome.optimized)
            .map(|outcome| outcome.actor.clone())
            .collect(),
        evaluated: outcomes
            .iter()
            .filter(|outcome| outcome.evaluated)
            .map(|outcome| outcome.actor.clone())
            .collect(),
        artefacts,
    };
    info!(
        run = %report.run_id,
        optimized = report.optimized.len(),
        evaluated = report.evaluated.len(),
        artefacts = report.artefacts.len(),
        "flow finished"
    );
    Ok(report)
}

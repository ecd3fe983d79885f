use std::error::Error;
use std::path::PathBuf;

use bandits_flow::serde::to_canonical_json_string;
use bandits_flow::FileHistory;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// History root directory.
    #[arg(long)]
    pub root: PathBuf,
    /// Experiment name.
    #[arg(long)]
    pub experiment: String,
    /// Scenario name.
    #[arg(long)]
    pub scenario: String,
    /// Actor name.
    #[arg(long)]
    pub actor: String,
}

#[derive(Debug, Serialize)]
struct HistoryView {
    run_id: Option<String>,
    best_params: Option<bandits_core::Params>,
    replicates: Option<usize>,
    steps: Vec<usize>,
    config_hash: Option<String>,
}

pub fn run(args: &HistoryArgs) -> Result<(), Box<dyn Error>> {
    let history = FileHistory::new(&args.root, &args.experiment);
    let run_id = history.latest_run(&args.scenario)?;
    let record = history.latest_record(&args.scenario, &args.actor)?;
    let view = match record {
        Some(record) => HistoryView {
            run_id,
            replicates: Some(record.result.len()),
            steps: record.result.iter().map(Vec::len).collect(),
            config_hash: Some(record.provenance.config_hash),
            best_params: Some(record.best_params),
        },
        None => HistoryView {
            run_id,
            best_params: None,
            replicates: None,
            steps: Vec::new(),
            config_hash: None,
        },
    };
    println!("{}", to_canonical_json_string(&view)?);
    Ok(())
}

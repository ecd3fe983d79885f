use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use bandits_demo::{demo_loaders, reporter_registry};
use bandits_flow::serde::to_canonical_json_string;
use bandits_flow::{
    load_config, run_flow, FileHistory, JsonlMetricsSink, MetricsSink, TracingMetricsSink,
};
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML flow configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Write evaluate-stage metrics to `<output_dir>/metrics.jsonl` instead of the log.
    #[arg(long)]
    pub jsonl: bool,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;
    let loaders = demo_loaders(&config.suggestion_dir);
    let history = FileHistory::new(&config.history_dir, &config.experiment_name);
    let sink: Arc<dyn MetricsSink> = if args.jsonl {
        Arc::new(JsonlMetricsSink::create(config.output_dir.join("metrics.jsonl"))?)
    } else {
        Arc::new(TracingMetricsSink)
    };

    let report = run_flow(&config, &loaders, &reporter_registry(), &history, Some(sink))?;
    println!("{}", to_canonical_json_string(&report)?);
    Ok(())
}

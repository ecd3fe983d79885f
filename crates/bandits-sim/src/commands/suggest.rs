use std::error::Error;
use std::path::PathBuf;

use bandits_flow::serde::to_canonical_json_string;
use bandits_flow::{Direction, Study, Suggester, SuggestionLoader, YamlSuggestionLoader};
use clap::Args;

#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Actor whose suggestion list is sampled.
    #[arg(long)]
    pub actor: String,
    /// Directory holding `<actor>.yml` suggestion lists.
    #[arg(long)]
    pub suggestions: PathBuf,
    /// Seed of the sampler.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

pub fn run(args: &SuggestArgs) -> Result<(), Box<dyn Error>> {
    let loader = YamlSuggestionLoader::new(&args.suggestions);
    let suggester = Suggester::new(loader.load(&args.actor)?);
    let mut study = Study::new(Direction::Maximize, args.seed);
    let mut trial = study.ask();
    let params = suggester.suggest(&mut trial)?;
    println!("{}", to_canonical_json_string(&params)?);
    Ok(())
}

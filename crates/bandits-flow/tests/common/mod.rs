#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{Action, Actor, Line, Params, Scenario};
use bandits_flow::{
    ActorRegistry, Loaders, ScenarioRegistry, StaticSuggestionLoader, Suggestion,
};
use serde_json::json;

/// Emits `len` lines carrying the step index and the construction seed.
pub struct CountingScenario {
    seed: u64,
    len: usize,
    cursor: Option<usize>,
}

impl CountingScenario {
    pub fn new(seed: u64, len: usize) -> Self {
        Self {
            seed,
            len,
            cursor: None,
        }
    }
}

impl Scenario for CountingScenario {
    fn scan(&mut self) -> bool {
        let next = self.cursor.map_or(0, |cursor| cursor + 1);
        self.cursor = Some(next);
        next < self.len
    }

    fn line(&self) -> Line {
        let mut line = Line::new();
        line.insert("t".to_string(), json!(self.cursor.unwrap_or(0)));
        line.insert("seed".to_string(), json!(self.seed));
        line
    }
}

/// Accumulates `gain` per line; metric `score` is the running total.
pub struct GainActor {
    seed: u64,
    gain: f64,
    total: f64,
}

impl Actor for GainActor {
    fn act(&mut self, line: &Line) -> Result<Action, FlowError> {
        self.total += self.gain;
        Ok(Action::new()
            .with_metric("score", self.total)
            .with_result("t", line["t"].clone())
            .with_result("seed", self.seed))
    }
}

/// Seeds observed by scenario and actor construction, in call order.
#[derive(Clone, Default)]
pub struct SeedLog {
    pub scenarios: Arc<Mutex<Vec<u64>>>,
    pub actors: Arc<Mutex<Vec<u64>>>,
}

impl SeedLog {
    pub fn scenario_seeds(&self) -> Vec<u64> {
        self.scenarios.lock().unwrap().clone()
    }

    pub fn actor_seeds(&self) -> Vec<u64> {
        self.actors.lock().unwrap().clone()
    }
}

pub fn gain_suggestions() -> Vec<Suggestion> {
    vec![Suggestion::Float {
        name: "gain".to_string(),
        low: 0.0,
        high: 1.0,
        step: Some(0.25),
        log: false,
    }]
}

/// Scenario `count` (length 3, or `3 + seed % 3` for `ragged`), actor
/// `gain`, actor `picky` (see [`PickyActor`]) and actor `broken` whose
/// `act` always fails.
pub fn loaders(log: &SeedLog) -> Loaders {
    let mut scenarios = ScenarioRegistry::new();
    let scenario_log = log.clone();
    scenarios.register("count", move |seed| {
        scenario_log.scenarios.lock().unwrap().push(seed);
        Ok(Box::new(CountingScenario::new(seed, 3)) as Box<dyn Scenario>)
    });
    scenarios.register("ragged", |seed| {
        Ok(Box::new(CountingScenario::new(seed, 3 + (seed % 3) as usize)) as Box<dyn Scenario>)
    });
    scenarios.register("empty", |seed| {
        Ok(Box::new(CountingScenario::new(seed, 0)) as Box<dyn Scenario>)
    });

    let mut actors = ActorRegistry::new();
    let actor_log = log.clone();
    actors.register("gain", move |params: &Params, seed| {
        actor_log.actors.lock().unwrap().push(seed);
        let gain = params.get("gain").and_then(|value| value.as_f64()).unwrap_or(1.0);
        Ok(Box::new(GainActor {
            seed,
            gain,
            total: 0.0,
        }) as Box<dyn Actor>)
    });
    actors.register("picky", |params: &Params, _| {
        let gain = params.get("gain").and_then(|value| value.as_f64()).unwrap_or(1.0);
        Ok(Box::new(PickyActor { gain, total: 0.0 }) as Box<dyn Actor>)
    });
    actors.register("broken", |_: &Params, _| {
        Ok(Box::new(BrokenActor) as Box<dyn Actor>)
    });

    let suggestions = StaticSuggestionLoader::new()
        .with("gain", gain_suggestions())
        .with("broken", gain_suggestions())
        .with("picky", gain_suggestions());

    Loaders::new(Arc::new(scenarios), Arc::new(actors), Arc::new(suggestions))
}

pub struct BrokenActor;

impl Actor for BrokenActor {
    fn act(&mut self, _line: &Line) -> Result<Action, FlowError> {
        Err(FlowError::Simulation(ErrorInfo::new(
            "actor-failed",
            "actor refused the line",
        )))
    }
}

/// Like `gain`, but fails every line when `gain < 0.25` and reports a NaN
/// score when `gain` is 0.25.
pub struct PickyActor {
    gain: f64,
    total: f64,
}

impl Actor for PickyActor {
    fn act(&mut self, _line: &Line) -> Result<Action, FlowError> {
        if self.gain < 0.25 {
            return Err(FlowError::Simulation(ErrorInfo::new(
                "actor-failed",
                "gain too low",
            )));
        }
        self.total += self.gain;
        let score = if self.gain < 0.5 { f64::NAN } else { self.total };
        Ok(Action::new().with_metric("score", score))
    }
}

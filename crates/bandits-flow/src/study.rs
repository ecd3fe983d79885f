use std::fmt;
use std::str::FromStr;

use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{ParamValue, Params};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::suggestion::Trial;

/// Whether the search prefers larger or smaller objective values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Larger objective values rank first.
    #[default]
    Maximize,
    /// Smaller objective values rank first.
    Minimize,
}

impl Direction {
    /// Returns true when `candidate` strictly improves on `incumbent`.
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Maximize => candidate > incumbent,
            Direction::Minimize => candidate < incumbent,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Maximize => write!(f, "maximize"),
            Direction::Minimize => write!(f, "minimize"),
        }
    }
}

impl FromStr for Direction {
    type Err = FlowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "maximize" => Ok(Direction::Maximize),
            "minimize" => Ok(Direction::Minimize),
            other => Err(FlowError::Config(
                ErrorInfo::new("unknown-direction", "direction must be maximize or minimize")
                    .with_context("direction", other),
            )),
        }
    }
}

/// Terminal state of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialState {
    /// The objective was computed.
    Complete,
    /// The objective failed and the trial was skipped.
    Failed,
}

/// Bookkeeping for one finished trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Zero-based trial number.
    pub number: usize,
    /// Parameters sampled for the trial.
    pub params: Params,
    /// Objective value when the trial completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Terminal state.
    pub state: TrialState,
    /// Error message captured for failed trials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Seeded random-search study.
///
/// Every trial draws its own sampler seed from the study RNG, so a study with
/// a fixed seed proposes the same parameter sequence on every execution.
#[derive(Debug)]
pub struct Study {
    direction: Direction,
    rng: StdRng,
    next_number: usize,
    trials: Vec<TrialRecord>,
}

impl Study {
    /// Creates an empty study.
    pub fn new(direction: Direction, seed: u64) -> Self {
        Self {
            direction,
            rng: StdRng::seed_from_u64(seed),
            next_number: 0,
            trials: Vec::new(),
        }
    }

    /// Opens the next trial.
    pub fn ask(&mut self) -> RandomTrial {
        let number = self.next_number;
        self.next_number += 1;
        RandomTrial {
            number,
            rng: StdRng::seed_from_u64(self.rng.next_u64()),
            params: Params::new(),
        }
    }

    /// Records a completed trial with its objective value.
    pub fn tell(&mut self, trial: RandomTrial, value: f64) -> &TrialRecord {
        self.push(TrialRecord {
            number: trial.number,
            params: trial.params,
            value: Some(value),
            state: TrialState::Complete,
            error: None,
        })
    }

    /// Records a trial whose objective could not be computed.
    pub fn fail(&mut self, trial: RandomTrial, error: &FlowError) -> &TrialRecord {
        self.push(TrialRecord {
            number: trial.number,
            params: trial.params,
            value: None,
            state: TrialState::Failed,
            error: Some(error.to_string()),
        })
    }

    fn push(&mut self, record: TrialRecord) -> &TrialRecord {
        self.trials.push(record);
        let last = self.trials.len() - 1;
        &self.trials[last]
    }

    /// All recorded trials in trial order.
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Best completed trial with a finite value; the earliest one wins ties.
    pub fn best_trial(&self) -> Option<&TrialRecord> {
        let mut best: Option<(&TrialRecord, f64)> = None;
        for record in &self.trials {
            let Some(value) = record.value.filter(|value| value.is_finite()) else {
                continue;
            };
            match best {
                Some((_, incumbent)) if !self.direction.improves(value, incumbent) => {}
                _ => best = Some((record, value)),
            }
        }
        best.map(|(record, _)| record)
    }
}

/// Trial context sampling every distribution independently at random.
#[derive(Debug)]
pub struct RandomTrial {
    number: usize,
    rng: StdRng,
    params: Params,
}

impl RandomTrial {
    /// Zero-based trial number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Parameters sampled so far.
    pub fn params(&self) -> &Params {
        &self.params
    }

    fn record(&mut self, name: &str, value: ParamValue) {
        self.params.insert(name.to_string(), value);
    }

    fn sample_linear(&mut self, low: f64, high: f64) -> f64 {
        if low == high {
            return low;
        }
        let value = low + (high - low) * self.rng.gen::<f64>();
        value.min(high)
    }

    fn sample_log(&mut self, low: f64, high: f64) -> f64 {
        let value = self.sample_linear(low.ln(), high.ln()).exp();
        value.clamp(low, high)
    }

    fn sample_grid(&mut self, low: f64, high: f64, step: f64) -> f64 {
        let slots = ((high - low) / step + 1e-9).floor() as u64;
        let index = self.rng.gen_range(0..=slots);
        (low + index as f64 * step).min(high)
    }
}

fn bounds_error(name: &str, message: &str) -> FlowError {
    FlowError::Config(
        ErrorInfo::new("suggestion-bounds", message.to_string()).with_context("name", name),
    )
}

fn check_range(name: &str, low: f64, high: f64) -> Result<(), FlowError> {
    if !low.is_finite() || !high.is_finite() {
        return Err(bounds_error(name, "bounds must be finite"));
    }
    if low > high {
        return Err(bounds_error(name, "low must not exceed high"));
    }
    Ok(())
}

fn check_log_range(name: &str, low: f64, high: f64) -> Result<(), FlowError> {
    check_range(name, low, high)?;
    if low <= 0.0 {
        return Err(bounds_error(name, "log-scaled bounds must be positive"));
    }
    Ok(())
}

impl Trial for RandomTrial {
    fn suggest_categorical(
        &mut self,
        name: &str,
        choices: &[ParamValue],
    ) -> Result<ParamValue, FlowError> {
        if choices.is_empty() {
            return Err(bounds_error(name, "categorical choices must not be empty"));
        }
        let value = choices[self.rng.gen_range(0..choices.len())].clone();
        self.record(name, value.clone());
        Ok(value)
    }

    fn suggest_discrete_uniform(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        q: f64,
    ) -> Result<f64, FlowError> {
        self.suggest_float(name, low, high, Some(q), false)
    }

    fn suggest_float(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        step: Option<f64>,
        log: bool,
    ) -> Result<f64, FlowError> {
        let value = match (step, log) {
            (Some(_), true) => {
                return Err(bounds_error(name, "step and log cannot be combined"));
            }
            (Some(step), false) => {
                check_range(name, low, high)?;
                if step.is_nan() || step <= 0.0 {
                    return Err(bounds_error(name, "step must be positive"));
                }
                self.sample_grid(low, high, step)
            }
            (None, true) => {
                check_log_range(name, low, high)?;
                self.sample_log(low, high)
            }
            (None, false) => {
                check_range(name, low, high)?;
                self.sample_linear(low, high)
            }
        };
        self.record(name, ParamValue::Float(value));
        Ok(value)
    }

    fn suggest_int(
        &mut self,
        name: &str,
        low: i64,
        high: i64,
        step: i64,
        log: bool,
    ) -> Result<i64, FlowError> {
        if low > high {
            return Err(bounds_error(name, "low must not exceed high"));
        }
        if step < 1 {
            return Err(bounds_error(name, "step must be at least 1"));
        }
        let value = if log {
            if step != 1 {
                return Err(bounds_error(name, "log-scaled integers require step 1"));
            }
            if low < 1 {
                return Err(bounds_error(name, "log-scaled bounds must be positive"));
            }
            let draw = self.sample_log(low as f64, high as f64 + 1.0).floor() as i64;
            draw.clamp(low, high)
        } else {
            // i128 keeps full-width bounds such as i64::MIN..=i64::MAX exact.
            let slots = (i128::from(high) - i128::from(low)) / i128::from(step);
            let offset = self.rng.gen_range(0..=slots) * i128::from(step);
            (i128::from(low) + offset) as i64
        };
        self.record(name, ParamValue::Int(value));
        Ok(value)
    }

    fn suggest_loguniform(&mut self, name: &str, low: f64, high: f64) -> Result<f64, FlowError> {
        self.suggest_float(name, low, high, None, true)
    }

    fn suggest_uniform(&mut self, name: &str, low: f64, high: f64) -> Result<f64, FlowError> {
        self.suggest_float(name, low, high, None, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_and_ranks() {
        let max: Direction = "maximize".parse().unwrap();
        let min: Direction = "minimize".parse().unwrap();
        assert!(max.improves(2.0, 1.0));
        assert!(min.improves(1.0, 2.0));
        assert!(!max.improves(1.0, 1.0));
        assert_eq!("sideways".parse::<Direction>().unwrap_err().code(), "unknown-direction");
    }

    #[test]
    fn samples_stay_within_bounds() {
        let mut study = Study::new(Direction::Maximize, 11);
        for _ in 0..200 {
            let mut trial = study.ask();
            let f = trial.suggest_uniform("u", -1.0, 1.0).unwrap();
            assert!((-1.0..=1.0).contains(&f));
            let l = trial.suggest_loguniform("l", 1e-3, 1.0).unwrap();
            assert!((1e-3..=1.0).contains(&l));
            let g = trial.suggest_discrete_uniform("g", 0.0, 1.0, 0.25).unwrap();
            assert!([0.0, 0.25, 0.5, 0.75, 1.0].contains(&g));
            let i = trial.suggest_int("i", 2, 10, 4, false).unwrap();
            assert!([2, 6, 10].contains(&i));
            let li = trial.suggest_int("li", 1, 100, 1, true).unwrap();
            assert!((1..=100).contains(&li));
            study.tell(trial, 0.0);
        }
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let mut study = Study::new(Direction::Maximize, 0);
        let mut trial = study.ask();
        assert!(trial.suggest_uniform("u", 2.0, 1.0).is_err());
        assert!(trial.suggest_loguniform("l", 0.0, 1.0).is_err());
        assert!(trial.suggest_float("f", 0.0, 1.0, Some(0.1), true).is_err());
        assert!(trial.suggest_int("i", 0, 5, 0, false).is_err());
        assert!(trial.suggest_categorical("c", &[]).is_err());
        assert!(trial.params().is_empty());
    }

    #[test]
    fn same_seed_proposes_same_sequence() {
        let draw = |seed| {
            let mut study = Study::new(Direction::Maximize, seed);
            (0..5)
                .map(|_| {
                    let mut trial = study.ask();
                    trial.suggest_uniform("x", 0.0, 1.0).unwrap()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(3), draw(3));
        assert_ne!(draw(3), draw(4));
    }

    #[test]
    fn best_trial_follows_direction_and_ties_keep_earliest() {
        let mut study = Study::new(Direction::Minimize, 0);
        for value in [3.0, 1.0, 1.0, 2.0] {
            let trial = study.ask();
            study.tell(trial, value);
        }
        let failed = study.ask();
        study.fail(
            failed,
            &FlowError::Objective(ErrorInfo::new("objective-no-data", "empty")),
        );
        let best = study.best_trial().unwrap();
        assert_eq!(best.number, 1);
        assert_eq!(best.value, Some(1.0));
        assert_eq!(study.trials()[4].state, TrialState::Failed);
    }

    #[test]
    fn full_width_int_range_samples_without_overflow() {
        let mut study = Study::new(Direction::Maximize, 5);
        for _ in 0..50 {
            let mut trial = study.ask();
            trial.suggest_int("i", i64::MIN, i64::MAX, 1, false).unwrap();
            let stepped = trial.suggest_int("s", i64::MIN, i64::MAX, 3, false).unwrap();
            assert_eq!((i128::from(stepped) - i128::from(i64::MIN)) % 3, 0);
        }
    }

    #[test]
    fn non_finite_values_never_rank_as_best() {
        let mut study = Study::new(Direction::Maximize, 0);
        for value in [f64::NAN, 5.0, 9.0, f64::INFINITY] {
            let trial = study.ask();
            study.tell(trial, value);
        }
        let best = study.best_trial().unwrap();
        assert_eq!(best.number, 2);
        assert_eq!(best.value, Some(9.0));
    }
}

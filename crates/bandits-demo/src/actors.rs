use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{Action, Actor, Line, ParamValue, Params, RngHandle};
use rand::Rng;
use serde_json::Value;

/// Per-arm pull counts and running mean rewards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmStats {
    /// Pulls per arm.
    pub counts: Vec<u64>,
    /// Mean observed reward per arm.
    pub values: Vec<f64>,
}

impl ArmStats {
    fn ensure_arms(&mut self, arms: usize) {
        if self.counts.len() != arms {
            self.counts = vec![0; arms];
            self.values = vec![0.0; arms];
        }
    }

    fn update(&mut self, arm: usize, reward: f64) {
        self.counts[arm] += 1;
        let n = self.counts[arm] as f64;
        self.values[arm] += (reward - self.values[arm]) / n;
    }

    fn total_pulls(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn untried(&self) -> Option<usize> {
        self.counts.iter().position(|count| *count == 0)
    }

    fn greedy(&self) -> usize {
        argmax(&self.values)
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

/// Arm selection rule of a bandit actor.
pub trait Policy: Send {
    /// Picks the arm to pull given the statistics so far.
    fn choose(&mut self, stats: &ArmStats, rng: &mut RngHandle) -> usize;
}

/// Explores uniformly with probability `epsilon`, otherwise exploits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    /// Exploration probability.
    pub epsilon: f64,
}

impl Policy for EpsilonGreedy {
    fn choose(&mut self, stats: &ArmStats, rng: &mut RngHandle) -> usize {
        if rng.gen::<f64>() < self.epsilon {
            rng.gen_range(0..stats.counts.len())
        } else {
            stats.greedy()
        }
    }
}

/// Upper confidence bound with exploration weight `c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ucb1 {
    /// Exploration weight.
    pub c: f64,
}

impl Policy for Ucb1 {
    fn choose(&mut self, stats: &ArmStats, _rng: &mut RngHandle) -> usize {
        if let Some(arm) = stats.untried() {
            return arm;
        }
        let log_total = (stats.total_pulls() as f64).ln();
        let scores: Vec<f64> = stats
            .values
            .iter()
            .zip(&stats.counts)
            .map(|(value, count)| value + self.c * (2.0 * log_total / *count as f64).sqrt())
            .collect();
        argmax(&scores)
    }
}

/// Boltzmann exploration with the given temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Softmax {
    /// Temperature; lower values exploit more.
    pub temperature: f64,
}

impl Policy for Softmax {
    fn choose(&mut self, stats: &ArmStats, rng: &mut RngHandle) -> usize {
        let scaled: Vec<f64> = stats
            .values
            .iter()
            .map(|value| value / self.temperature)
            .collect();
        let peak = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = scaled.iter().map(|value| (value - peak).exp()).collect();
        let total: f64 = weights.iter().sum();
        let mut draw = rng.gen::<f64>() * total;
        for (arm, weight) in weights.iter().enumerate() {
            if draw < *weight {
                return arm;
            }
            draw -= weight;
        }
        weights.len() - 1
    }
}

/// Bandit actor wrapping a [`Policy`].
///
/// Metrics per action: `cum_reward`, `cum_regret` (expected regret against the
/// optimal arm) and `optimal_rate`. Result: `{ arm, reward }`.
pub struct BanditActor<P> {
    policy: P,
    rng: RngHandle,
    stats: ArmStats,
    steps: u64,
    optimal_pulls: u64,
    cum_reward: f64,
    cum_regret: f64,
}

impl<P: Policy> BanditActor<P> {
    /// Creates an actor with its own seeded RNG.
    pub fn new(policy: P, seed: u64) -> Self {
        Self {
            policy,
            rng: RngHandle::from_seed(seed),
            stats: ArmStats::default(),
            steps: 0,
            optimal_pulls: 0,
            cum_reward: 0.0,
            cum_regret: 0.0,
        }
    }
}

impl<P: Policy> Actor for BanditActor<P> {
    fn act(&mut self, line: &Line) -> Result<Action, FlowError> {
        let rewards = float_array(line, "rewards")?;
        let probs = float_array(line, "probs")?;
        if rewards.is_empty() || rewards.len() != probs.len() {
            return Err(line_error(
                "rewards and probs must be non-empty and aligned",
                "rewards",
            ));
        }
        let optimal = line
            .get("optimal_arm")
            .and_then(Value::as_u64)
            .map(|arm| arm as usize)
            .unwrap_or_else(|| argmax(&probs));
        if optimal >= probs.len() {
            return Err(line_error("optimal_arm out of range", "optimal_arm"));
        }

        self.stats.ensure_arms(rewards.len());
        let arm = self.policy.choose(&self.stats, &mut self.rng);
        let reward = rewards[arm];
        self.stats.update(arm, reward);

        self.steps += 1;
        if arm == optimal {
            self.optimal_pulls += 1;
        }
        self.cum_reward += reward;
        self.cum_regret += probs[optimal] - probs[arm];

        Ok(Action::new()
            .with_metric("cum_reward", self.cum_reward)
            .with_metric("cum_regret", self.cum_regret)
            .with_metric(
                "optimal_rate",
                self.optimal_pulls as f64 / self.steps as f64,
            )
            .with_result("arm", arm as u64)
            .with_result("reward", reward))
    }
}

fn line_error(message: &str, key: &str) -> FlowError {
    FlowError::Simulation(ErrorInfo::new("bad-line", message).with_context("field", key))
}

fn float_array(line: &Line, key: &str) -> Result<Vec<f64>, FlowError> {
    let values = line
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| line_error("missing array field", key))?;
    values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .ok_or_else(|| line_error("non-numeric array entry", key))
        })
        .collect()
}

/// Reads a float parameter, falling back to `default` when absent or null.
///
/// Values must satisfy `valid`; anything else is a configuration error.
pub fn float_param(
    params: &Params,
    name: &str,
    default: f64,
    valid: impl Fn(f64) -> bool,
) -> Result<f64, FlowError> {
    let value = match params.get(name) {
        None | Some(ParamValue::Null) => default,
        Some(value) => value.as_f64().ok_or_else(|| {
            FlowError::Config(
                ErrorInfo::new("actor-param", "parameter must be numeric")
                    .with_context("name", name)
                    .with_context("value", value.to_string()),
            )
        })?,
    };
    if !valid(value) {
        return Err(FlowError::Config(
            ErrorInfo::new("actor-param", "parameter out of range")
                .with_context("name", name)
                .with_context("value", value.to_string()),
        ));
    }
    Ok(value)
}

/// Builds the epsilon-greedy actor from `{ epsilon }` (default 0.1).
pub fn epsilon_greedy(params: &Params, seed: u64) -> Result<Box<dyn Actor>, FlowError> {
    let epsilon = float_param(params, "epsilon", 0.1, |v| (0.0..=1.0).contains(&v))?;
    Ok(Box::new(BanditActor::new(EpsilonGreedy { epsilon }, seed)))
}

/// Builds the UCB1 actor from `{ c }` (default 1.0).
pub fn ucb1(params: &Params, seed: u64) -> Result<Box<dyn Actor>, FlowError> {
    let c = float_param(params, "c", 1.0, |v| v.is_finite() && v >= 0.0)?;
    Ok(Box::new(BanditActor::new(Ucb1 { c }, seed)))
}

/// Builds the softmax actor from `{ temperature }` (default 0.1).
pub fn softmax(params: &Params, seed: u64) -> Result<Box<dyn Actor>, FlowError> {
    let temperature = float_param(params, "temperature", 0.1, |v| v.is_finite() && v > 0.0)?;
    Ok(Box::new(BanditActor::new(Softmax { temperature }, seed)))
}

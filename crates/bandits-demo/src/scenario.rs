use bandits_core::errors::{ErrorInfo, FlowError};
use bandits_core::{Line, RngHandle, Scenario};
use rand::Rng;
use serde_json::json;

/// Arm probabilities and horizon of a Bernoulli bandit.
#[derive(Debug, Clone, PartialEq)]
pub struct BernoulliSpec {
    /// Success probability per arm.
    pub probs: Vec<f64>,
    /// Number of rounds per replicate.
    pub horizon: usize,
}

impl BernoulliSpec {
    /// Checks the probabilities and arm count.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.probs.is_empty() {
            return Err(FlowError::Config(ErrorInfo::new(
                "scenario-arms",
                "a bandit needs at least one arm",
            )));
        }
        if let Some(p) = self.probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(FlowError::Config(
                ErrorInfo::new("scenario-prob", "arm probability outside [0, 1]")
                    .with_context("prob", p.to_string()),
            ));
        }
        Ok(())
    }

    /// Index of the arm with the highest success probability (first on ties).
    pub fn optimal_arm(&self) -> usize {
        let mut best = 0;
        for (arm, p) in self.probs.iter().enumerate() {
            if *p > self.probs[best] {
                best = arm;
            }
        }
        best
    }
}

/// Multi-armed Bernoulli bandit.
///
/// Every round draws a full reward vector up front, so the line records the
/// counterfactual reward of every arm. Line fields: `t`, `rewards`, `probs`
/// and `optimal_arm`.
pub struct BernoulliScenario {
    spec: BernoulliSpec,
    optimal_arm: usize,
    rng: RngHandle,
    step: Option<usize>,
    rewards: Vec<u8>,
}

impl BernoulliScenario {
    /// Creates a bandit whose reward draws are seeded with `seed`.
    pub fn new(spec: BernoulliSpec, seed: u64) -> Result<Self, FlowError> {
        spec.validate()?;
        let optimal_arm = spec.optimal_arm();
        Ok(Self {
            rewards: vec![0; spec.probs.len()],
            spec,
            optimal_arm,
            rng: RngHandle::from_seed(seed),
            step: None,
        })
    }
}

impl Scenario for BernoulliScenario {
    fn scan(&mut self) -> bool {
        let next = self.step.map_or(0, |step| step + 1);
        if next >= self.spec.horizon {
            self.step = Some(self.spec.horizon);
            return false;
        }
        self.step = Some(next);
        for (reward, p) in self.rewards.iter_mut().zip(&self.spec.probs) {
            *reward = u8::from(self.rng.gen_bool(*p));
        }
        true
    }

    fn line(&self) -> Line {
        Line::from([
            ("t".to_string(), json!(self.step.unwrap_or(0))),
            ("rewards".to_string(), json!(self.rewards)),
            ("probs".to_string(), json!(self.spec.probs)),
            ("optimal_arm".to_string(), json!(self.optimal_arm)),
        ])
    }
}

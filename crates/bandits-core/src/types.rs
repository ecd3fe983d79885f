use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scalar value of a tunable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Absent value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Free-form string.
    Str(String),
}

impl ParamValue {
    /// Returns the value as a float when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(value) => Some(*value as f64),
            ParamValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an integer when it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Str(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

/// Concrete parameter set handed to actor construction.
pub type Params = BTreeMap<String, ParamValue>;

/// One event record produced by a scenario.
pub type Line = BTreeMap<String, Value>;

/// One actor response to a scenario line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Action {
    /// Named metric values observed after the action.
    #[serde(default)]
    pub metric: BTreeMap<String, f64>,
    /// Free-form payload, opaque to the engine.
    #[serde(default)]
    pub result: BTreeMap<String, Value>,
}

impl Action {
    /// Creates an empty action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a metric value to the action.
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metric.insert(name.into(), value);
        self
    }

    /// Adds a result entry to the action.
    pub fn with_result(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.result.insert(name.into(), value.into());
        self
    }
}

/// Actions of a single replicate in scenario scan order.
pub type Replicate = Vec<Action>;

/// Replicates of a simulation ordered by replicate index.
pub type SimulationResult = Vec<Replicate>;

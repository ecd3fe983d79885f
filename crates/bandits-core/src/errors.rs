//! Structured error types shared across banditsflow crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`FlowError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (actor names, trial numbers, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the banditsflow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum FlowError {
    /// Invalid or inconsistent configuration, including suggestion bounds.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// A named scenario, actor, suggestion list or reporter could not be resolved.
    #[error("resolve error: {0}")]
    Resolve(ErrorInfo),
    /// The objective could not be computed from the simulation output.
    #[error("objective error: {0}")]
    Objective(ErrorInfo),
    /// Search algorithm and trial bookkeeping errors.
    #[error("trial error: {0}")]
    Trial(ErrorInfo),
    /// Failures raised by scenarios, actors or action callbacks.
    #[error("simulation error: {0}")]
    Simulation(ErrorInfo),
    /// History store lookup and persistence errors.
    #[error("history error: {0}")]
    History(ErrorInfo),
    /// Reporter failures.
    #[error("report error: {0}")]
    Report(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl FlowError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            FlowError::Config(info)
            | FlowError::Resolve(info)
            | FlowError::Objective(info)
            | FlowError::Trial(info)
            | FlowError::Simulation(info)
            | FlowError::History(info)
            | FlowError::Report(info)
            | FlowError::Serde(info) => info,
        }
    }

    /// Returns the stable machine readable code of the error.
    pub fn code(&self) -> &str {
        &self.info().code
    }
}

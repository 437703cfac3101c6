use std::fmt;

use crate::dsp::graph::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum FxError {
    /// The host cannot run an audio context at this rate.
    UnsupportedSampleRate(f64),
    InvalidTone { frequency: f64, duration: f64 },
    InvalidAutomation(AutomationError),
    UnknownNode(NodeId),
    WrongNodeKind { node: NodeId, expected: &'static str },
    GraphCycle { from: NodeId, to: NodeId },
    Config(String),
    /// WAV encoding failed.
    Encode(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationError {
    NonFiniteTime(f64),
    NonFiniteValue(f64),
    NonPositiveExponentialTarget(f64),
}

impl fmt::Display for FxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FxError::UnsupportedSampleRate(rate) => {
                write!(f, "Audio unavailable: unsupported sample rate {rate}")
            }
            FxError::InvalidTone { frequency, duration } => write!(
                f,
                "Invalid tone: frequency {frequency} Hz, duration {duration} s (both must be positive)"
            ),
            FxError::InvalidAutomation(e) => write!(f, "Automation error: {e}"),
            FxError::UnknownNode(id) => write!(f, "Unknown audio node {id:?}"),
            FxError::WrongNodeKind { node, expected } => {
                write!(f, "Audio node {node:?} is not a {expected}")
            }
            FxError::GraphCycle { from, to } => {
                write!(f, "Connecting {from:?} -> {to:?} would create a cycle")
            }
            FxError::Config(msg) => write!(f, "Config error: {msg}"),
            FxError::Encode(msg) => write!(f, "WAV encode error: {msg}"),
        }
    }
}

impl std::error::Error for FxError {}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationError::NonFiniteTime(t) => write!(f, "event time {t} is not finite"),
            AutomationError::NonFiniteValue(v) => write!(f, "event value {v} is not finite"),
            AutomationError::NonPositiveExponentialTarget(v) => {
                write!(f, "exponential ramp target {v} must be positive")
            }
        }
    }
}

impl std::error::Error for AutomationError {}

impl From<AutomationError> for FxError {
    fn from(e: AutomationError) -> Self {
        FxError::InvalidAutomation(e)
    }
}

impl From<serde_json::Error> for FxError {
    fn from(e: serde_json::Error) -> Self {
        FxError::Config(e.to_string())
    }
}

impl From<hound::Error> for FxError {
    fn from(e: hound::Error) -> Self {
        FxError::Encode(e.to_string())
    }
}

//! The audio capability a tone needs from its host.
//!
//! `AudioContext` implements it in Rust; a browser binding could implement
//! it over WebAudio nodes instead.

use serde::{Deserialize, Serialize};

use crate::error::FxError;

use super::envelope::ParamEvent;
use super::oscillator::Waveform;

/// Opaque handle to a node owned by an `AudioHost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

pub trait AudioHost {
    /// Monotonic audio clock in seconds.
    fn current_time(&self) -> f64;

    /// The output sink every audible path ends in.
    fn destination(&self) -> NodeId;

    /// A source node. Silent until started.
    fn create_oscillator(&mut self, waveform: Waveform, frequency: f64) -> NodeId;

    /// A gain node whose gain can be automated. Gain defaults to 1.
    fn create_gain(&mut self) -> NodeId;

    fn create_lowpass(&mut self, cutoff: f64, q: f64) -> NodeId;

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), FxError>;

    /// Add an automation event to a gain node's gain parameter.
    fn schedule(&mut self, gain: NodeId, event: ParamEvent) -> Result<(), FxError>;

    fn start(&mut self, source: NodeId, when: f64) -> Result<(), FxError>;

    /// Stop a source at `when`. A later call replaces an earlier stop time.
    fn stop(&mut self, source: NodeId, when: f64) -> Result<(), FxError>;
}

//! Voice — one struck tone wired into a host audio graph.

use serde::{Deserialize, Serialize};

use crate::config::SynthConfig;
use crate::error::{AutomationError, FxError};

use super::envelope::ParamEvent;
use super::graph::{AudioHost, NodeId};

/// A transient tone request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    /// Fundamental in Hz.
    pub frequency: f64,
    /// Seconds until both oscillators stop.
    pub duration: f64,
    /// Layer an overtone over the fundamental.
    pub harmonic: bool,
}

impl Tone {
    pub fn new(frequency: f64, duration: f64) -> Self {
        Tone {
            frequency,
            duration,
            harmonic: true,
        }
    }

    pub fn with_harmonic(mut self, harmonic: bool) -> Self {
        self.harmonic = harmonic;
        self
    }

    pub fn validate(&self) -> Result<(), FxError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.frequency) && ok(self.duration) {
            Ok(())
        } else {
            Err(FxError::InvalidTone {
                frequency: self.frequency,
                duration: self.duration,
            })
        }
    }
}

/// The scheduled oscillators of one tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneVoice {
    pub primary: NodeId,
    pub harmonic: Option<NodeId>,
    pub start: f64,
    pub stop: f64,
}

impl ToneVoice {
    pub fn sources(&self) -> impl Iterator<Item = NodeId> {
        std::iter::once(self.primary).chain(self.harmonic)
    }

    pub fn is_sounding(&self, now: f64) -> bool {
        now < self.stop
    }
}

/// Build the node graph for `tone` starting at `when`:
///
/// ```text
/// oscillator -> low-pass -> gain (envelope) -> destination
/// overtone oscillator -> gain (decay)       -> destination
/// ```
///
/// Every time and automation event is checked before the first node is
/// created, so a rejected tone leaves the host untouched.
pub fn schedule_tone<H: AudioHost + ?Sized>(
    host: &mut H,
    config: &SynthConfig,
    tone: &Tone,
    when: f64,
) -> Result<ToneVoice, FxError> {
    tone.validate()?;
    let stop = when + tone.duration;
    for t in [when, stop] {
        if !t.is_finite() {
            return Err(AutomationError::NonFiniteTime(t).into());
        }
    }

    let envelope = config.envelope.events(when, tone.duration);
    let h = &config.harmonic;
    let overtone = tone.harmonic.then_some([
        ParamEvent::SetValue {
            value: h.gain,
            time: when,
        },
        ParamEvent::ExponentialRamp {
            value: h.floor,
            end_time: stop,
        },
    ]);
    for event in envelope.iter().chain(overtone.iter().flatten()) {
        event.validate()?;
    }

    let destination = host.destination();
    let primary = host.create_oscillator(config.waveform, tone.frequency);
    let filter = host.create_lowpass(config.cutoff, config.q);
    let gain = host.create_gain();
    for event in envelope {
        host.schedule(gain, event)?;
    }
    host.connect(primary, filter)?;
    host.connect(filter, gain)?;
    host.connect(gain, destination)?;
    host.start(primary, when)?;
    host.stop(primary, stop)?;

    let harmonic = if let Some(events) = overtone {
        let osc = host.create_oscillator(h.waveform, tone.frequency * h.ratio);
        let gain = host.create_gain();
        for event in events {
            host.schedule(gain, event)?;
        }
        host.connect(osc, gain)?;
        host.connect(gain, destination)?;
        host.start(osc, when)?;
        host.stop(osc, stop)?;
        Some(osc)
    } else {
        None
    };

    Ok(ToneVoice {
        primary,
        harmonic,
        start: when,
        stop,
    })
}

//! Gain automation: a WebAudio-style `AudioParam` timeline.
//!
//! Envelopes are not stateful generators here. Each gain node owns an
//! `AudioParam` whose value is a pure function of time, built from
//! set-value and ramp events scheduled ahead on the audio clock.

use serde::{Deserialize, Serialize};

use crate::error::AutomationError;

/// One scheduled automation event. Times are absolute context seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamEvent {
    /// Jump to `value` at `time`.
    SetValue { value: f64, time: f64 },
    /// Linear ramp from the previous event, reaching `value` at `end_time`.
    LinearRamp { value: f64, end_time: f64 },
    /// Exponential ramp from the previous event, reaching `value` at `end_time`.
    ExponentialRamp { value: f64, end_time: f64 },
}

impl ParamEvent {
    pub fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } => time,
            ParamEvent::LinearRamp { end_time, .. } => end_time,
            ParamEvent::ExponentialRamp { end_time, .. } => end_time,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { value, .. }
            | ParamEvent::LinearRamp { value, .. }
            | ParamEvent::ExponentialRamp { value, .. } => value,
        }
    }

    pub fn validate(&self) -> Result<(), AutomationError> {
        let (time, value) = (self.time(), self.value());
        if !time.is_finite() {
            return Err(AutomationError::NonFiniteTime(time));
        }
        if !value.is_finite() {
            return Err(AutomationError::NonFiniteValue(value));
        }
        if let ParamEvent::ExponentialRamp { value, .. } = *self {
            if value <= 0.0 {
                return Err(AutomationError::NonPositiveExponentialTarget(value));
            }
        }
        Ok(())
    }
}

/// A time-varying parameter value.
#[derive(Debug, Clone)]
pub struct AudioParam {
    default_value: f64,
    /// Sorted by event time; equal times keep insertion order.
    events: Vec<ParamEvent>,
}

impl AudioParam {
    pub fn new(default_value: f64) -> Self {
        AudioParam {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    /// Insert an event into the timeline.
    pub fn schedule(&mut self, event: ParamEvent) -> Result<(), AutomationError> {
        event.validate()?;
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
        Ok(())
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> Result<(), AutomationError> {
        self.schedule(ParamEvent::SetValue { value, time })
    }

    pub fn linear_ramp_to_value_at_time(
        &mut self,
        value: f64,
        end_time: f64,
    ) -> Result<(), AutomationError> {
        self.schedule(ParamEvent::LinearRamp { value, end_time })
    }

    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f64,
        end_time: f64,
    ) -> Result<(), AutomationError> {
        self.schedule(ParamEvent::ExponentialRamp { value, end_time })
    }

    /// Value of the parameter at context time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let next = self.events.partition_point(|e| e.time() <= t);
        let (t0, v0) = match next.checked_sub(1) {
            Some(prev) => (self.events[prev].time(), self.events[prev].value()),
            None => (0.0, self.default_value),
        };

        let Some(upcoming) = self.events.get(next) else {
            return v0;
        };

        let t1 = upcoming.time();
        let span = t1 - t0;
        match *upcoming {
            ParamEvent::SetValue { .. } => v0,
            ParamEvent::LinearRamp { value: v1, .. } => {
                if span <= 0.0 {
                    return v1;
                }
                v0 + (v1 - v0) * (t - t0) / span
            }
            ParamEvent::ExponentialRamp { value: v1, .. } => {
                // A ramp out of zero (or across a sign change) holds until its end.
                if v0 <= 0.0 {
                    return v0;
                }
                if span <= 0.0 {
                    return v1;
                }
                v0 * (v1 / v0).powf((t - t0) / span)
            }
        }
    }
}

/// The attack/decay/release gain shape of a struck tone.
///
/// Gain rises linearly from 0 to `peak` over `attack` seconds, falls
/// exponentially to `sustain` by `decay_end`, then exponentially to `floor`
/// at the end of the tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneEnvelope {
    pub peak: f64,
    pub attack: f64,
    pub sustain: f64,
    pub decay_end: f64,
    pub floor: f64,
}

impl Default for ToneEnvelope {
    fn default() -> Self {
        ToneEnvelope {
            peak: 0.4,
            attack: 0.01,
            sustain: 0.2,
            decay_end: 0.1,
            floor: 0.01,
        }
    }
}

impl ToneEnvelope {
    /// The timeline for a tone starting at `start` and lasting `duration`.
    pub fn events(&self, start: f64, duration: f64) -> [ParamEvent; 4] {
        [
            ParamEvent::SetValue {
                value: 0.0,
                time: start,
            },
            ParamEvent::LinearRamp {
                value: self.peak,
                end_time: start + self.attack,
            },
            ParamEvent::ExponentialRamp {
                value: self.sustain,
                end_time: start + self.decay_end,
            },
            ParamEvent::ExponentialRamp {
                value: self.floor,
                end_time: start + duration,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_param(start: f64, duration: f64) -> AudioParam {
        let mut p = AudioParam::new(1.0);
        for e in ToneEnvelope::default().events(start, duration) {
            p.schedule(e).unwrap();
        }
        p
    }

    #[test]
    fn empty_timeline_returns_default() {
        let p = AudioParam::new(1.0);
        assert_eq!(p.value_at(0.0), 1.0);
        assert_eq!(p.value_at(12.5), 1.0);
    }

    #[test]
    fn tone_shape_hits_its_marks() {
        let p = tone_param(0.0, 1.0);
        assert!(p.value_at(0.0).abs() < 1e-12, "silent at onset");
        assert!((p.value_at(0.005) - 0.2).abs() < 1e-9, "half way up the attack");
        assert!((p.value_at(0.01) - 0.4).abs() < 1e-9, "peak after attack");
        assert!((p.value_at(0.1) - 0.2).abs() < 1e-9, "sustain after decay");
        assert!(p.value_at(1.0) <= 0.01 + 1e-12, "decayed at end");
        assert!(p.value_at(5.0) <= 0.01 + 1e-12, "holds the floor afterwards");
    }

    #[test]
    fn tone_shape_decays_monotonically_after_peak() {
        let p = tone_param(2.0, 1.5);
        let mut prev = p.value_at(2.01);
        let mut t = 2.02;
        while t <= 3.5 {
            let v = p.value_at(t);
            assert!(v <= prev + 1e-12, "gain rose at t={t}: {prev} -> {v}");
            prev = v;
            t += 0.01;
        }
    }

    #[test]
    fn before_first_set_value_uses_default() {
        let p = tone_param(3.0, 1.0);
        assert_eq!(p.value_at(1.0), 1.0);
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(0.1, 0.0).unwrap();
        p.exponential_ramp_to_value_at_time(0.01, 1.0).unwrap();
        let mid = p.value_at(0.5);
        assert!((mid - 0.1_f64 * 0.1_f64.sqrt()).abs() < 1e-12, "got {mid}");
    }

    #[test]
    fn exponential_ramp_from_zero_holds() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(0.0, 0.0).unwrap();
        p.exponential_ramp_to_value_at_time(0.5, 1.0).unwrap();
        assert_eq!(p.value_at(0.99), 0.0);
        assert_eq!(p.value_at(1.0), 0.5);
    }

    #[test]
    fn events_sorted_by_time() {
        let mut p = AudioParam::new(1.0);
        p.exponential_ramp_to_value_at_time(0.01, 2.0).unwrap();
        p.set_value_at_time(0.3, 0.0).unwrap();
        let times: Vec<f64> = p.events().iter().map(ParamEvent::time).collect();
        assert_eq!(times, vec![0.0, 2.0]);
    }

    #[test]
    fn rejects_bad_events() {
        let mut p = AudioParam::new(1.0);
        assert_eq!(
            p.exponential_ramp_to_value_at_time(0.0, 1.0),
            Err(AutomationError::NonPositiveExponentialTarget(0.0))
        );
        assert_eq!(
            p.set_value_at_time(f64::NAN, 1.0).map_err(|e| e.to_string()),
            Err("event value NaN is not finite".to_string())
        );
        assert!(matches!(
            p.linear_ramp_to_value_at_time(1.0, f64::INFINITY),
            Err(AutomationError::NonFiniteTime(_))
        ));
        assert!(p.events().is_empty());
    }
}

//! Configuration for the synthesizer and the particle field.
//!
//! Every struct deserializes with `#[serde(default)]`, so a partial JSON
//! object only overrides what it names. Defaults reproduce the site's
//! hand-tuned constants.

use serde::{Deserialize, Serialize};

use crate::dsp::context::MAX_SAMPLE_RATE;
use crate::dsp::envelope::ToneEnvelope;
use crate::dsp::oscillator::Waveform;
use crate::error::FxError;
use crate::theme::Theme;

// ── Studio ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub synth: SynthConfig,
    pub field: FieldConfig,
    /// Theme used when no preference has been stored yet.
    pub theme: Theme,
}

impl StudioConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(source: &str) -> Result<Self, FxError> {
        let config: StudioConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FxError> {
        self.synth.validate()?;
        self.field.validate()
    }
}

// ── Synthesizer ─────────────────────────────────────────────

/// Shape of the harmonic overtone layered over the primary tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonicConfig {
    /// Frequency multiple of the primary tone.
    pub ratio: f64,
    pub waveform: Waveform,
    pub gain: f64,
    /// Gain reached at the end of the tone.
    pub floor: f64,
}

impl Default for HarmonicConfig {
    fn default() -> Self {
        HarmonicConfig {
            ratio: 2.0,
            waveform: Waveform::Sine,
            gain: 0.1,
            floor: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Whether sound starts enabled.
    pub enabled: bool,
    pub waveform: Waveform,
    /// Low-pass cutoff in Hz.
    pub cutoff: f64,
    /// Low-pass resonance in dB.
    pub q: f64,
    pub envelope: ToneEnvelope,
    pub harmonic: HarmonicConfig,
    /// Whether tones played without an explicit flag carry the overtone.
    pub harmonic_by_default: bool,
    /// Seconds, used when a caller does not give a duration.
    pub default_duration: f64,
    /// Concurrent voice cap. `None` leaves polyphony unbounded.
    pub max_voices: Option<usize>,
    pub master_gain: f64,
    pub soft_clip: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            enabled: true,
            waveform: Waveform::Triangle,
            cutoff: 2000.0,
            q: 1.0,
            envelope: ToneEnvelope::default(),
            harmonic: HarmonicConfig::default(),
            harmonic_by_default: true,
            default_duration: 1.0,
            max_voices: Some(32),
            master_gain: 1.0,
            soft_clip: true,
        }
    }
}

impl SynthConfig {
    /// The music page's key voice: a bare sine set to 0.3 at onset and
    /// decaying exponentially to 0.01 at the end of the tone. The low-pass
    /// cutoff sits above the Nyquist frequency of every supported rate.
    pub fn music_page() -> Self {
        SynthConfig {
            waveform: Waveform::Sine,
            cutoff: MAX_SAMPLE_RATE,
            envelope: ToneEnvelope {
                peak: 0.3,
                attack: 0.0,
                sustain: 0.3,
                decay_end: 0.0,
                floor: 0.01,
            },
            harmonic_by_default: false,
            ..SynthConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), FxError> {
        let env = &self.envelope;
        let positive = [
            ("synth.cutoff", self.cutoff),
            ("synth.default_duration", self.default_duration),
            ("synth.envelope.peak", env.peak),
            ("synth.envelope.sustain", env.sustain),
            ("synth.envelope.floor", env.floor),
            ("synth.harmonic.ratio", self.harmonic.ratio),
            ("synth.harmonic.floor", self.harmonic.floor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(FxError::Config(format!("{name} must be positive, got {value}")));
            }
        }

        let non_negative = [
            ("synth.envelope.attack", env.attack),
            ("synth.envelope.decay_end", env.decay_end),
            ("synth.harmonic.gain", self.harmonic.gain),
            ("synth.master_gain", self.master_gain),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FxError::Config(format!("{name} must not be negative, got {value}")));
            }
        }

        if !self.q.is_finite() {
            return Err(FxError::Config(format!("synth.q must be finite, got {}", self.q)));
        }
        if env.decay_end < env.attack {
            return Err(FxError::Config(
                "synth.envelope.decay_end must not precede the end of the attack".to_string(),
            ));
        }
        if self.max_voices == Some(0) {
            return Err(FxError::Config(
                "synth.max_voices must be at least 1 (use null for no cap)".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Particle field ──────────────────────────────────────────

/// What happens when a particle leaves the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Re-enter at the opposite edge.
    Wrap,
    /// Flip the velocity component that crossed.
    Bounce,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Coloring {
    /// One colour; each particle draws its own alpha.
    Solid { r: u8, g: u8, b: u8 },
    /// Each particle carries a hue that advances every frame.
    Spectrum {
        saturation: f32,
        lightness: f32,
        hue_step: f32,
    },
}

/// Pointer push-back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repulsion {
    pub radius: f32,
    /// Fraction of the pointer offset applied at zero distance.
    pub strength: f32,
}

impl Default for Repulsion {
    fn default() -> Self {
        Repulsion {
            radius: 100.0,
            strength: 0.03,
        }
    }
}

/// Lines drawn between nearby particles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkStyle {
    pub distance: f32,
    /// Opacity of a link between coincident particles.
    pub opacity: f32,
    pub width: f32,
}

impl Default for LinkStyle {
    fn default() -> Self {
        LinkStyle {
            distance: 150.0,
            opacity: 0.2,
            width: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborSearch {
    /// Test every pair.
    #[default]
    Pairwise,
    /// Bucket particles into a grid of link-distance cells first.
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub max_particles: usize,
    /// Viewport pixels of width per particle.
    pub pixels_per_particle: f32,
    /// Overrides the width rule (still capped by `max_particles`).
    pub fixed_count: Option<usize>,
    pub radius_min: f32,
    pub radius_max: f32,
    /// Velocity components are drawn from `[-max_speed, max_speed)`.
    pub max_speed: f32,
    pub alpha_min: f32,
    pub alpha_max: f32,
    pub coloring: Coloring,
    pub edge: EdgeMode,
    pub repulsion: Option<Repulsion>,
    pub links: Option<LinkStyle>,
    pub neighbor_search: NeighborSearch,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig::constellation()
    }
}

impl FieldConfig {
    /// Drifting cyan points joined by faint lines, pushed away by the pointer.
    pub fn constellation() -> Self {
        FieldConfig {
            max_particles: 100,
            pixels_per_particle: 10.0,
            fixed_count: None,
            radius_min: 0.5,
            radius_max: 2.5,
            max_speed: 1.0,
            alpha_min: 0.2,
            alpha_max: 0.7,
            coloring: Coloring::Solid { r: 0, g: 212, b: 255 },
            edge: EdgeMode::Wrap,
            repulsion: Some(Repulsion::default()),
            links: Some(LinkStyle::default()),
            neighbor_search: NeighborSearch::Pairwise,
        }
    }

    /// Fifty colour-cycling points bouncing off the viewport edges.
    pub fn spectrum() -> Self {
        FieldConfig {
            max_particles: 100,
            pixels_per_particle: 10.0,
            fixed_count: Some(50),
            radius_min: 1.0,
            radius_max: 4.0,
            max_speed: 1.0,
            alpha_min: 0.8,
            alpha_max: 0.8,
            coloring: Coloring::Spectrum {
                saturation: 100.0,
                lightness: 50.0,
                hue_step: 1.0,
            },
            edge: EdgeMode::Bounce,
            repulsion: None,
            links: None,
            neighbor_search: NeighborSearch::Pairwise,
        }
    }

    pub fn validate(&self) -> Result<(), FxError> {
        if !(self.pixels_per_particle.is_finite() && self.pixels_per_particle > 0.0) {
            return Err(FxError::Config(format!(
                "field.pixels_per_particle must be positive, got {}",
                self.pixels_per_particle
            )));
        }
        let ranges = [
            ("field.radius", self.radius_min, self.radius_max),
            ("field.alpha", self.alpha_min, self.alpha_max),
        ];
        for (name, min, max) in ranges {
            if !(min.is_finite() && max.is_finite() && 0.0 <= min && min <= max) {
                return Err(FxError::Config(format!(
                    "{name} range [{min}, {max}) is invalid"
                )));
            }
        }
        if !(self.max_speed.is_finite() && self.max_speed >= 0.0) {
            return Err(FxError::Config(format!(
                "field.max_speed must not be negative, got {}",
                self.max_speed
            )));
        }
        if let Some(r) = &self.repulsion {
            if !(r.radius.is_finite() && r.radius > 0.0 && r.strength.is_finite()) {
                return Err(FxError::Config("field.repulsion is invalid".to_string()));
            }
        }
        if let Some(l) = &self.links {
            if !(l.distance.is_finite() && l.distance > 0.0 && l.opacity.is_finite()) {
                return Err(FxError::Config("field.links is invalid".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        StudioConfig::default().validate().unwrap();
        SynthConfig::music_page().validate().unwrap();
        FieldConfig::spectrum().validate().unwrap();
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config = StudioConfig::from_json(
            r#"{
                "synth": { "max_voices": null, "envelope": { "peak": 0.5 } },
                "field": { "edge": "bounce", "links": null },
                "theme": "light"
            }"#,
        )
        .unwrap();

        assert_eq!(config.synth.max_voices, None);
        assert_eq!(config.synth.envelope.peak, 0.5);
        assert_eq!(config.synth.envelope.attack, 0.01);
        assert_eq!(config.synth.cutoff, 2000.0);
        assert_eq!(config.field.edge, EdgeMode::Bounce);
        assert_eq!(config.field.links, None);
        assert_eq!(config.field.max_particles, 100);
        assert_eq!(config.theme, Theme::Light);
    }

    #[test]
    fn coloring_is_tagged_by_mode() {
        let c: Coloring = serde_json::from_str(
            r#"{ "mode": "spectrum", "saturation": 80, "lightness": 40, "hue_step": 2 }"#,
        )
        .unwrap();
        assert_eq!(
            c,
            Coloring::Spectrum {
                saturation: 80.0,
                lightness: 40.0,
                hue_step: 2.0
            }
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let bad = [
            r#"{ "synth": { "max_voices": 0 } }"#,
            r#"{ "synth": { "cutoff": -5 } }"#,
            r#"{ "synth": { "envelope": { "floor": 0 } } }"#,
            r#"{ "synth": { "envelope": { "attack": 0.5, "decay_end": 0.1 } } }"#,
            r#"{ "field": { "pixels_per_particle": 0 } }"#,
            r#"{ "field": { "radius_min": 3, "radius_max": 1 } }"#,
        ];
        for source in bad {
            assert!(
                matches!(StudioConfig::from_json(source), Err(FxError::Config(_))),
                "should reject {source}"
            );
        }
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            StudioConfig::from_json("{ synth: "),
            Err(FxError::Config(_))
        ));
    }
}

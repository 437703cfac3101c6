pub mod config;
pub mod dsp;
pub mod error;
pub mod notes;
pub mod particles;
pub mod phrase;
pub mod theme;
pub mod web;

use crate::config::SynthConfig;
use crate::dsp::voice::Tone;
use crate::theme::Theme;
use wasm_bindgen::prelude::*;

pub use crate::dsp::context::AudioContext;
pub use crate::dsp::synth::ToneSynthesizer;
pub use crate::error::FxError;
pub use crate::particles::ParticleField;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the studio_fx version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render one default tone to mono f32 samples.
#[wasm_bindgen]
pub fn render_tone_samples(frequency: f64, duration: f64, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    dsp::renderer::render_tone(&SynthConfig::default(), sample_rate, &Tone::new(frequency, duration))
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render one default tone to a 16-bit mono WAV byte array.
#[wasm_bindgen]
pub fn render_tone_wav(frequency: f64, duration: f64, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let samples = dsp::renderer::render_tone(
        &SynthConfig::default(),
        sample_rate,
        &Tone::new(frequency, duration),
    )
    .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    dsp::renderer::encode_wav(&samples, sample_rate).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: frequency of a piano key or note name, if it parses.
#[wasm_bindgen]
pub fn note_frequency(name: &str) -> Option<f64> {
    notes::key_frequency(name)
}

/// WASM-exposed: the theme after toggling `current`. Unknown names count
/// as the default theme.
#[wasm_bindgen]
pub fn next_theme(current: &str) -> String {
    current
        .parse::<Theme>()
        .unwrap_or_default()
        .toggled()
        .as_str()
        .to_string()
}

//! DSP — a small WebAudio-style node graph rendered in pure Rust.
//!
//! The same code schedules UI tones in the browser (rendered by an
//! AudioWorklet through WASM) and renders them offline to WAV.

pub mod context;
pub mod envelope;
pub mod filter;
pub mod graph;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod synth;
pub mod voice;

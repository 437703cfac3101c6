//! Offline renderer — tones and phrases to mono samples or WAV bytes.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::config::SynthConfig;
use crate::error::FxError;
use crate::phrase::Phrase;

use super::context::AudioContext;
use super::synth::ToneSynthesizer;
use super::voice::Tone;

/// Extra render time allowed past the last scheduled stop.
const TAIL_SECONDS: f64 = 1.0;

fn context_for(config: &SynthConfig, sample_rate: u32) -> Result<AudioContext, FxError> {
    Ok(AudioContext::new(sample_rate as f64)?.with_master(config.master_gain, config.soft_clip))
}

/// Render one tone from t=0 until its voice has been released.
/// The sound switch in `config` is ignored.
pub fn render_tone(config: &SynthConfig, sample_rate: u32, tone: &Tone) -> Result<Vec<f32>, FxError> {
    let mut ctx = context_for(config, sample_rate)?;
    let mut synth = ToneSynthesizer::new(config.clone())?;
    synth.set_enabled(true);
    synth.play_tone(&mut ctx, tone)?;
    Ok(ctx.render_until_idle(tone.duration + TAIL_SECONDS))
}

/// Render every step of `phrase` once. Looping phrases play a single pass.
pub fn render_phrase(
    config: &SynthConfig,
    sample_rate: u32,
    phrase: &Phrase,
) -> Result<Vec<f32>, FxError> {
    let mut ctx = context_for(config, sample_rate)?;
    let mut synth = ToneSynthesizer::new(config.clone())?;
    synth.set_enabled(true);
    synth.play_phrase(&mut ctx, phrase)?;
    Ok(ctx.render_until_idle(phrase.length() + TAIL_SECONDS))
}

/// Encode mono samples as a 16-bit PCM WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, FxError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

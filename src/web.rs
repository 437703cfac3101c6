//! WASM classes driven by the site's JavaScript.
//!
//! `StudioAudio` owns the audio context and is pulled by an AudioWorklet
//! through `render`. `ParticleCanvas` is stepped once per animation frame
//! and hands back the draw commands for a 2-D canvas to replay.

use glam::Vec2;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

use crate::config::{FieldConfig, SynthConfig};
use crate::dsp::context::AudioContext;
use crate::dsp::graph::AudioHost;
use crate::dsp::synth::ToneSynthesizer;
use crate::error::FxError;
use crate::notes::{key_frequency, mixtape_frequency};
use crate::particles::{DrawList, ParticleField};
use crate::phrase::{KeySequence, Phrase};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// `undefined` / `null` select the defaults.
fn config_from<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(value).map_err(js_err)
    }
}

// ── Audio ───────────────────────────────────────────────────

#[wasm_bindgen]
pub struct StudioAudio {
    ctx: AudioContext,
    synth: ToneSynthesizer,
    secret: KeySequence,
}

#[wasm_bindgen]
impl StudioAudio {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64, config: JsValue) -> Result<StudioAudio, JsValue> {
        let config: SynthConfig = config_from(config)?;
        StudioAudio::with_config(sample_rate, config).map_err(js_err)
    }

    /// Audio with the music page's plain sine voice.
    pub fn music_page(sample_rate: f64) -> Result<StudioAudio, JsValue> {
        StudioAudio::with_config(sample_rate, SynthConfig::music_page()).map_err(js_err)
    }

    /// Play a tone now. Returns false when sound is switched off.
    pub fn play(&mut self, frequency: f64, duration: Option<f64>) -> Result<bool, JsValue> {
        let duration = duration.unwrap_or(self.synth.config().default_duration);
        let voice = self
            .synth
            .play(&mut self.ctx, frequency, duration)
            .map_err(js_err)?;
        Ok(voice.is_some())
    }

    /// Play a piano key (`"C#"`) or a full note name (`"F#3"`).
    pub fn play_key(&mut self, name: &str) -> Result<bool, JsValue> {
        let frequency = key_frequency(name).ok_or_else(|| js_err(format!("unknown key {name:?}")))?;
        self.play(frequency, None)
    }

    /// The hover note of the mixtape at shelf position `index`.
    pub fn play_mixtape(&mut self, index: usize) -> Result<bool, JsValue> {
        let frequency =
            mixtape_frequency(index).ok_or_else(|| js_err(format!("no mixtape note {index}")))?;
        self.play(frequency, Some(0.3))
    }

    /// Schedule a preset phrase (`intro`, `opening_chord`, `victory`,
    /// `music_mode`, `player_loop`). Looping phrases keep repeating until
    /// `stop_loop`. Returns how many tones were scheduled.
    pub fn play_phrase(&mut self, name: &str) -> Result<usize, JsValue> {
        let phrase = Phrase::named(name).ok_or_else(|| js_err(format!("unknown phrase {name:?}")))?;
        let scheduled = if phrase.loop_length().is_some() {
            self.synth.start_loop(&mut self.ctx, &phrase)
        } else {
            self.synth.play_phrase(&mut self.ctx, &phrase)
        };
        scheduled.map_err(js_err)
    }

    /// Stop a looping phrase after the notes already scheduled.
    pub fn stop_loop(&mut self) {
        self.synth.stop_loop();
    }

    pub fn is_looping(&self) -> bool {
        self.synth.is_looping()
    }

    /// Feed a typed key; plays the music-mode phrase when the secret word
    /// completes. Returns true on a match.
    pub fn type_key(&mut self, key: char) -> Result<bool, JsValue> {
        if !self.secret.push(key) {
            return Ok(false);
        }
        debug!("secret word typed");
        self.play_phrase("music_mode")?;
        Ok(true)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.synth.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.synth.is_enabled()
    }

    /// Flip the sound switch, returning the new state.
    pub fn toggle_sound(&mut self) -> bool {
        self.synth.toggle()
    }

    /// Render the next block of mono samples. A running loop schedules
    /// its next pass when that pass starts within this block.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let horizon = frames as f64 / self.ctx.sample_rate();
        if let Err(e) = self.synth.advance_loop(&mut self.ctx, horizon) {
            warn!("phrase loop stopped: {e}");
            self.synth.stop_loop();
        }
        self.ctx.render(frames)
    }

    pub fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }
}

impl StudioAudio {
    pub fn with_config(sample_rate: f64, config: SynthConfig) -> Result<Self, FxError> {
        let ctx = AudioContext::new(sample_rate)?.with_master(config.master_gain, config.soft_clip);
        Ok(StudioAudio {
            ctx,
            synth: ToneSynthesizer::new(config)?,
            secret: KeySequence::default(),
        })
    }
}

// ── Particles ───────────────────────────────────────────────

#[wasm_bindgen]
pub struct ParticleCanvas {
    field: ParticleField,
    pointer: Option<Vec2>,
    draw_list: DrawList,
}

#[wasm_bindgen]
impl ParticleCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, seed: u32, config: JsValue) -> Result<ParticleCanvas, JsValue> {
        let config: FieldConfig = config_from(config)?;
        ParticleCanvas::with_config(width, height, seed, config).map_err(js_err)
    }

    /// The music page backdrop.
    pub fn spectrum(width: f32, height: f32, seed: u32) -> Result<ParticleCanvas, JsValue> {
        ParticleCanvas::with_config(width, height, seed, FieldConfig::spectrum()).map_err(js_err)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.field.resize(width, height);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.pointer = Some(Vec2::new(x, y));
    }

    pub fn pointer_leave(&mut self) {
        self.pointer = None;
    }

    /// Step and render one frame; returns the draw commands.
    pub fn frame(&mut self) -> Result<JsValue, JsValue> {
        let commands = self.next_frame();
        serde_wasm_bindgen::to_value(commands).map_err(js_err)
    }

    pub fn particle_count(&self) -> usize {
        self.field.len()
    }
}

impl ParticleCanvas {
    pub fn with_config(
        width: f32,
        height: f32,
        seed: u32,
        config: FieldConfig,
    ) -> Result<Self, FxError> {
        let mut field = ParticleField::new(config, u64::from(seed))?;
        field.init(width, height);
        Ok(ParticleCanvas {
            field,
            pointer: None,
            draw_list: DrawList::new(),
        })
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    /// Step and render into the reused draw list.
    pub fn next_frame(&mut self) -> &DrawList {
        self.draw_list.clear();
        self.field.frame(self.pointer, &mut self.draw_list);
        &self.draw_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::DrawCommand;

    #[test]
    fn audio_plays_keys_and_renders() {
        let mut audio = StudioAudio::with_config(48000.0, SynthConfig::default()).unwrap();
        assert!(audio.play_key("A").unwrap());
        assert!(audio.play_key("C5").unwrap());
        let block = audio.render(4800);
        assert_eq!(block.len(), 4800);
        assert!(block.iter().any(|s| s.abs() > 0.01));
        assert!((audio.current_time() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn switched_off_audio_schedules_nothing() {
        let mut audio = StudioAudio::with_config(44100.0, SynthConfig::default()).unwrap();
        assert!(!audio.toggle_sound());
        assert!(!audio.play(440.0, Some(0.5)).unwrap());
        assert_eq!(audio.play_phrase("intro").unwrap(), 0);
        assert!(audio.render(1024).iter().all(|s| *s == 0.0));
        audio.set_enabled(true);
        assert!(audio.is_enabled());
        assert_eq!(audio.play_phrase("intro").unwrap(), 8);
    }

    #[test]
    fn secret_word_plays_the_music_phrase() {
        let mut audio = StudioAudio::with_config(44100.0, SynthConfig::default()).unwrap();
        let hits: Vec<bool> = "xmusic".chars().map(|c| audio.type_key(c).unwrap()).collect();
        assert_eq!(hits, vec![false, false, false, false, false, true]);
        assert_eq!(audio.synth.active_voices(0.0), 5);
    }

    #[test]
    fn player_loop_repeats_until_stopped() {
        let mut audio = StudioAudio::with_config(8000.0, SynthConfig::default()).unwrap();
        assert_eq!(audio.play_phrase("player_loop").unwrap(), 4);
        assert!(audio.is_looping());

        // 2.2 s: the first pass has ended, the second is sounding.
        for _ in 0..(2.2 * 8000.0 / 128.0) as usize + 1 {
            audio.render(128);
        }
        let now = audio.current_time();
        assert!(now > 2.2);
        assert!(audio.synth.active_voices(now) > 0, "second pass should be scheduled");

        audio.stop_loop();
        assert!(!audio.is_looping());
        for _ in 0..(2.4 * 8000.0 / 128.0) as usize {
            audio.render(128);
        }
        let now = audio.current_time();
        assert!(now > 4.5);
        assert_eq!(audio.synth.active_voices(now), 0, "no third pass after stop");
    }

    #[test]
    fn one_shot_phrases_do_not_loop() {
        let mut audio = StudioAudio::with_config(8000.0, SynthConfig::default()).unwrap();
        assert_eq!(audio.play_phrase("victory").unwrap(), 4);
        assert_eq!(audio.play_phrase("opening_chord").unwrap(), 3);
        assert!(!audio.is_looping());
    }

    #[test]
    fn music_page_voice_plays_mixtapes_and_the_secret_word() {
        let mut audio = StudioAudio::with_config(8000.0, SynthConfig::music_page()).unwrap();
        assert!(audio.play_mixtape(6).unwrap());
        for c in "music".chars() {
            audio.type_key(c).unwrap();
        }
        assert_eq!(audio.synth.active_voices(0.0), 6);
        assert_eq!(audio.ctx.node_count(), 1 + 6 * 3, "one filtered sine per tone, no overtone");
    }

    #[test]
    fn canvas_frames_follow_the_pointer() {
        let mut canvas =
            ParticleCanvas::with_config(500.0, 400.0, 9, FieldConfig::constellation()).unwrap();
        assert_eq!(canvas.particle_count(), 50);

        canvas.pointer_move(250.0, 200.0);
        let first = canvas.next_frame().clone();
        assert!(matches!(first.commands()[0], DrawCommand::Clear { .. }));
        canvas.pointer_leave();
        assert_eq!(canvas.pointer, None);
        let second = canvas.next_frame().clone();
        assert_eq!(second.commands()[0], first.commands()[0]);
        assert_ne!(second, first);

        canvas.resize(100.0, 400.0);
        assert_eq!(canvas.particle_count(), 10);
    }
}

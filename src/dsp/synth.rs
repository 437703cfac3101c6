//! ToneSynthesizer — the sound switch and voice pool in front of `schedule_tone`.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::config::SynthConfig;
use crate::error::FxError;
use crate::phrase::Phrase;

use super::graph::AudioHost;
use super::voice::{Tone, ToneVoice, schedule_tone};

/// Plays short tones into whatever `AudioHost` it is handed.
///
/// The synthesizer does not own the audio context; callers create one at
/// startup and pass it to every call.
#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    config: SynthConfig,
    enabled: bool,
    /// Voices that may still be sounding, oldest first.
    voices: VecDeque<ToneVoice>,
    looping: Option<PhraseLoop>,
}

/// A phrase that is rescheduled every `period` seconds.
#[derive(Debug, Clone)]
struct PhraseLoop {
    phrase: Phrase,
    period: f64,
    next_start: f64,
}

impl ToneSynthesizer {
    pub fn new(config: SynthConfig) -> Result<Self, FxError> {
        config.validate()?;
        Ok(ToneSynthesizer::unchecked(config))
    }

    fn unchecked(config: SynthConfig) -> Self {
        ToneSynthesizer {
            enabled: config.enabled,
            config,
            voices: VecDeque::new(),
            looping: None,
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flip the sound switch, returning the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Play `frequency` for `duration` seconds, starting now.
    ///
    /// Returns `Ok(None)` without touching the host when sound is disabled.
    pub fn play<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        frequency: f64,
        duration: f64,
    ) -> Result<Option<ToneVoice>, FxError> {
        let tone = Tone::new(frequency, duration).with_harmonic(self.config.harmonic_by_default);
        let now = host.current_time();
        self.play_tone_at(host, &tone, now)
    }

    /// Play with the configured default duration.
    pub fn play_default<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        frequency: f64,
    ) -> Result<Option<ToneVoice>, FxError> {
        let duration = self.config.default_duration;
        self.play(host, frequency, duration)
    }

    pub fn play_tone<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        tone: &Tone,
    ) -> Result<Option<ToneVoice>, FxError> {
        let now = host.current_time();
        self.play_tone_at(host, tone, now)
    }

    /// Schedule `tone` to start at context time `when`. Times in the past
    /// start immediately.
    pub fn play_tone_at<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        tone: &Tone,
        when: f64,
    ) -> Result<Option<ToneVoice>, FxError> {
        if !self.enabled {
            return Ok(None);
        }
        tone.validate()?;

        let now = host.current_time();
        self.make_room(host, now)?;

        let voice = schedule_tone(host, &self.config, tone, when.max(now))?;
        trace!(
            "tone {:.2} Hz for {:.3} s at t={:.3}",
            tone.frequency, tone.duration, voice.start
        );
        self.voices.push_back(voice);
        Ok(Some(voice))
    }

    /// Schedule every step of `phrase` relative to now. Returns how many
    /// tones were scheduled (zero when sound is disabled).
    pub fn play_phrase<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        phrase: &Phrase,
    ) -> Result<usize, FxError> {
        let now = host.current_time();
        self.play_phrase_at(host, phrase, now)
    }

    fn play_phrase_at<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        phrase: &Phrase,
        start: f64,
    ) -> Result<usize, FxError> {
        let mut scheduled = 0;
        for step in phrase.steps() {
            let tone = Tone::new(step.frequency, step.duration)
                .with_harmonic(self.config.harmonic_by_default);
            if self.play_tone_at(host, &tone, start + step.offset)?.is_some() {
                scheduled += 1;
            }
        }
        Ok(scheduled)
    }

    /// Play `phrase` now and keep repeating it every loop length (or its
    /// own length when it has none) until `stop_loop`. Replaces any
    /// running loop. Returns the tones scheduled for the first pass.
    pub fn start_loop<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        phrase: &Phrase,
    ) -> Result<usize, FxError> {
        let period = phrase.loop_length().unwrap_or_else(|| phrase.length());
        if !(period.is_finite() && period > 0.0) {
            return Err(FxError::Config(format!(
                "phrase loop length must be positive, got {period}"
            )));
        }
        let now = host.current_time();
        self.looping = None;
        let scheduled = self.play_phrase_at(host, phrase, now)?;
        self.looping = Some(PhraseLoop {
            phrase: phrase.clone(),
            period,
            next_start: now + period,
        });
        debug!("phrase loop started, period {period} s");
        Ok(scheduled)
    }

    /// Schedule every loop pass starting within `horizon` seconds of now.
    /// Call before rendering each block. Passes that fall while sound is
    /// off are skipped but keep the loop in time.
    pub fn advance_loop<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        horizon: f64,
    ) -> Result<usize, FxError> {
        let Some(mut lp) = self.looping.take() else {
            return Ok(0);
        };
        let now = host.current_time();
        let mut scheduled = 0;
        while lp.next_start <= now + horizon {
            let start = lp.next_start;
            lp.next_start += lp.period;
            scheduled += self.play_phrase_at(host, &lp.phrase, start)?;
        }
        self.looping = Some(lp);
        Ok(scheduled)
    }

    /// Stop repeating. Notes already scheduled still play out.
    pub fn stop_loop(&mut self) {
        if self.looping.take().is_some() {
            debug!("phrase loop stopped");
        }
    }

    pub fn is_looping(&self) -> bool {
        self.looping.is_some()
    }

    /// Voices not yet past their stop time.
    pub fn active_voices(&self, now: f64) -> usize {
        self.voices.iter().filter(|v| v.is_sounding(now)).count()
    }

    /// Forget finished voices, then steal the oldest while the pool is full.
    fn make_room<H: AudioHost + ?Sized>(&mut self, host: &mut H, now: f64) -> Result<(), FxError> {
        self.voices.retain(|v| v.is_sounding(now));

        let Some(max) = self.config.max_voices else {
            return Ok(());
        };
        while self.voices.len() >= max {
            let Some(oldest) = self.voices.pop_front() else {
                break;
            };
            warn!("voice limit {max} reached, stealing voice started at t={:.3}", oldest.start);
            for source in oldest.sources() {
                host.stop(source, now)?;
            }
        }
        Ok(())
    }
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        ToneSynthesizer::unchecked(SynthConfig::default())
    }
}

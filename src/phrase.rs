//! Short timed melodies and the typed secret word that triggers one.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::notes::note_to_frequency;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhraseStep {
    /// Seconds after the phrase starts.
    pub offset: f64,
    pub frequency: f64,
    pub duration: f64,
}

/// A list of notes to schedule relative to a start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    steps: Vec<PhraseStep>,
    /// Seconds before the phrase repeats, for looping phrases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loop_length: Option<f64>,
}

impl Phrase {
    pub fn new(steps: Vec<PhraseStep>) -> Self {
        Phrase {
            steps,
            loop_length: None,
        }
    }

    /// Evenly spaced notes: step `i` starts at `i * spacing`.
    /// Unknown note names are skipped.
    pub fn from_notes(notes: &[&str], spacing: f64, duration: f64) -> Self {
        let steps = notes
            .iter()
            .filter_map(|n| note_to_frequency(n))
            .enumerate()
            .map(|(i, frequency)| PhraseStep {
                offset: i as f64 * spacing,
                frequency,
                duration,
            })
            .collect();
        Phrase::new(steps)
    }

    pub fn looping(mut self, loop_length: f64) -> Self {
        self.loop_length = Some(loop_length);
        self
    }

    pub fn steps(&self) -> &[PhraseStep] {
        &self.steps
    }

    pub fn loop_length(&self) -> Option<f64> {
        self.loop_length
    }

    /// Seconds from the first onset until the last note stops.
    pub fn length(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| s.offset + s.duration)
            .fold(0.0, f64::max)
    }

    /// The C major scale run played when the player opens.
    pub fn intro() -> Self {
        Phrase::from_notes(
            &["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5"],
            0.1,
            0.2,
        )
    }

    /// The arpeggio played when the secret word is typed.
    pub fn music_mode() -> Self {
        Phrase::from_notes(&["C4", "E4", "G4", "E4", "C4"], 0.2, 1.0)
    }

    /// The C-E-G chord that greets visitors, each note held 2 s.
    pub fn opening_chord() -> Self {
        Phrase::from_notes(&["C4", "E4", "G4"], 0.1, 2.0)
    }

    /// Rolled C major arpeggio up to C5, played when a poster is clicked.
    pub fn victory() -> Self {
        Phrase::from_notes(&["C4", "E4", "G4", "C5"], 0.1, 0.5)
    }

    /// The music player's repeating pattern.
    pub fn player_loop() -> Self {
        Phrase::from_notes(&["C4", "E4", "G4", "E4"], 0.5, 0.5).looping(2.0)
    }

    /// Look up a preset by name.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "intro" => Some(Phrase::intro()),
            "opening_chord" | "openingChord" => Some(Phrase::opening_chord()),
            "victory" => Some(Phrase::victory()),
            "music_mode" | "musicMode" => Some(Phrase::music_mode()),
            "player_loop" | "playerLoop" => Some(Phrase::player_loop()),
            _ => None,
        }
    }
}

/// Watches typed keys for a secret word.
#[derive(Debug, Clone)]
pub struct KeySequence {
    word: Vec<char>,
    recent: VecDeque<char>,
}

impl KeySequence {
    pub fn new(word: &str) -> Self {
        let word: Vec<char> = word.chars().flat_map(char::to_lowercase).collect();
        KeySequence {
            recent: VecDeque::with_capacity(word.len()),
            word,
        }
    }

    /// Feed one key press. Returns true when the last keys spell the word.
    pub fn push(&mut self, key: char) -> bool {
        if self.word.is_empty() {
            return false;
        }
        for c in key.to_lowercase() {
            if self.recent.len() == self.word.len() {
                self.recent.pop_front();
            }
            self.recent.push_back(c);
        }
        self.recent.iter().eq(self.word.iter())
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}

impl Default for KeySequence {
    fn default() -> Self {
        KeySequence::new("music")
    }
}

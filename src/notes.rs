//! Note names to frequencies (12-TET).

/// Reference pitch of A4 in Hz.
pub const A4_HZ: f64 = 440.0;

/// The twelve piano keys, in keyboard order starting at C.
pub const PIANO_KEYS: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Octave assumed for bare key names such as `"F#"`.
pub const KEY_OCTAVE: i32 = 4;

/// Parse a note name (e.g. "C4", "F#3", "Bb5") into a MIDI note number.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let mut chars = note.chars();
    let base_semitone = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (semitone, octave_str) = match rest.as_bytes().first() {
        Some(b'#') => (base_semitone + 1, &rest[1..]),
        Some(b'b') => (base_semitone - 1, &rest[1..]),
        _ => (base_semitone, rest),
    };

    let octave: i32 = octave_str.parse().ok()?;

    // MIDI note number: C4 = 60
    Some((octave + 1) * 12 + semitone)
}

/// `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// Frequency of a full note name at A4 = 440 Hz.
pub fn note_to_frequency(note: &str) -> Option<f64> {
    note_to_midi(note).map(|midi| midi_to_frequency(midi, A4_HZ))
}

/// Frequency of a piano key name. Bare names (`"C#"`) sound in octave 4;
/// names with an octave are passed through.
pub fn key_frequency(key: &str) -> Option<f64> {
    if PIANO_KEYS.contains(&key) {
        note_to_frequency(&format!("{key}{KEY_OCTAVE}"))
    } else {
        note_to_frequency(key)
    }
}

/// Notes the mixtape shelf plays on hover, cycled by shelf position.
pub const MIXTAPE_NOTES: [&str; 4] = ["C4", "E4", "G4", "A4"];

/// Frequency for the mixtape at `index`, wrapping around the shelf.
pub fn mixtape_frequency(index: usize) -> Option<f64> {
    note_to_frequency(MIXTAPE_NOTES[index % MIXTAPE_NOTES.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn a4_and_c4() {
        assert_eq!(note_to_frequency("A4"), Some(440.0));
        assert!(close(note_to_frequency("C4").unwrap(), 261.63));
    }

    #[test]
    fn accidentals() {
        assert_eq!(note_to_midi("C#4"), Some(61));
        assert_eq!(note_to_midi("Db4"), Some(61));
        assert_eq!(note_to_midi("Bb5"), Some(82));
        assert_eq!(note_to_midi("C-1"), Some(0));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "H4", "C", "C#", "c4", "C4x"] {
            assert_eq!(note_to_midi(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn piano_key_table_matches_the_site() {
        let expected = [
            261.63, 277.18, 293.66, 311.13, 329.63, 349.23, 369.99, 392.00, 415.30, 440.00,
            466.16, 493.88,
        ];
        for (key, hz) in PIANO_KEYS.iter().zip(expected) {
            let f = key_frequency(key).unwrap();
            assert!(close(f, hz), "{key}: {f} vs {hz}");
        }
    }

    #[test]
    fn keys_with_octaves_pass_through() {
        assert!(close(key_frequency("C5").unwrap(), 523.25));
        assert_eq!(key_frequency("X"), None);
    }

    #[test]
    fn mixtape_notes_wrap() {
        assert!(close(mixtape_frequency(0).unwrap(), 261.63));
        assert!(close(mixtape_frequency(3).unwrap(), 440.0));
        assert!(close(mixtape_frequency(5).unwrap(), 329.63));
    }
}

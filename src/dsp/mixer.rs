//! Mixer — the destination bus. Overlapping tones simply sum here.

/// Accumulates one render block of destination samples.
#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    /// Apply a tanh soft clipper on output.
    pub soft_clip: bool,
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new(master_gain: f64, soft_clip: bool) -> Self {
        Mixer {
            master_gain,
            soft_clip,
            buffer: Vec::new(),
        }
    }

    /// Prepare a zeroed block of `num_samples`.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    pub fn add(&mut self, index: usize, sample: f64) {
        if let Some(slot) = self.buffer.get_mut(index) {
            *slot += sample;
        }
    }

    /// The block with master gain (and optional soft clipping) applied.
    pub fn output(&self) -> Vec<f32> {
        self.buffer
            .iter()
            .map(|&s| {
                let s = s * self.master_gain;
                let s = if self.soft_clip { s.tanh() } else { s };
                s as f32
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Mixer::new(1.0, true)
    }
}

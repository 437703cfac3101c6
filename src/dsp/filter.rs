//! Low-pass biquad using the WebAudio `BiquadFilterNode` coefficient formulas.

use std::f64::consts::PI;

/// A 2nd-order low-pass IIR filter (Direct Form II Transposed).
///
/// As in WebAudio, `q` for a low-pass is a resonance in dB:
/// `alpha = sin(w0) / (2 * 10^(q / 20))`.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
}

impl BiquadFilter {
    pub fn lowpass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            frequency,
            q,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        };
        f.update_coefficients();
        f
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    fn update_coefficients(&mut self) {
        let nyquist = self.sample_rate / 2.0;
        let cutoff = self.frequency.clamp(0.0, nyquist) / nyquist;

        // Fully open: pass the input through unchanged.
        if cutoff >= 1.0 {
            self.set_normalized(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
            return;
        }
        // Fully closed: silence.
        if cutoff <= 0.0 {
            self.set_normalized(0.0, 0.0, 0.0, 1.0, 0.0, 0.0);
            return;
        }

        let w0 = PI * cutoff;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * 10.0_f64.powf(self.q / 20.0));

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        self.set_normalized(b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha);
    }

    fn set_normalized(&mut self, b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) {
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

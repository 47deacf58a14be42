//! Fixed per-channel filter chains
//!
//! Two compositions of biquad sections behind a DC blocker. Section order is
//! fixed at construction and never reordered at runtime. Each chain instance
//! has exactly one owner: concurrent calls into one chain are prevented by
//! ownership, not by locking.

use vitals_types::FilterConfig;

use crate::biquad::{Biquad, BiquadCoeffs};

/// One-pole high-pass pinned at DC: `y = x - x1 + alpha * y1`.
#[derive(Clone, Debug)]
pub struct DcBlocker {
    alpha: f32,
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            x1: 0.0,
            y1: 0.0,
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.alpha * self.y1;
        self.x1 = x;
        self.y1 = y;
        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

/// ECG/PPG waveform chain:
/// DC blocker → mains notch → harmonic notch → high-pass → low-pass.
#[derive(Clone, Debug)]
pub struct SignalChain {
    dc: DcBlocker,
    notch_mains: Biquad,
    notch_harmonic: Biquad,
    high_pass: Biquad,
    low_pass: Biquad,
}

impl SignalChain {
    pub fn new(cfg: &FilterConfig, sample_rate: f32) -> Self {
        Self {
            dc: DcBlocker::new(cfg.dc_alpha),
            notch_mains: Biquad::new(BiquadCoeffs::notch(
                cfg.notch_freq_hz,
                sample_rate,
                cfg.notch_q,
            )),
            notch_harmonic: Biquad::new(BiquadCoeffs::notch(
                cfg.notch_harmonic_hz,
                sample_rate,
                cfg.notch_q,
            )),
            high_pass: Biquad::new(BiquadCoeffs::high_pass(cfg.band_low_hz, sample_rate)),
            low_pass: Biquad::new(BiquadCoeffs::low_pass(cfg.band_high_hz, sample_rate)),
        }
    }

    /// Run one sample through the full chain.
    ///
    /// Pure given the chain state. Non-finite values are zeroed at both ends
    /// so a corrupted sample degrades one output, not the session.
    pub fn process(&mut self, x: f32) -> f32 {
        if !x.is_finite() {
            return 0.0;
        }
        let mut y = self.dc.process(x);
        y = self.notch_mains.process(y);
        y = self.notch_harmonic.process(y);
        y = self.high_pass.process(y);
        y = self.low_pass.process(y);
        if y.is_finite() {
            y
        } else {
            0.0
        }
    }

    /// Zero every delay line. Call on lead reattach or session restart so a
    /// discontinuity does not ring through stale state.
    pub fn reset(&mut self) {
        self.dc.reset();
        self.notch_mains.reset();
        self.notch_harmonic.reset();
        self.high_pass.reset();
        self.low_pass.reset();
    }
}

/// Body-sound chain: DC blocker → 80 Hz high-pass.
#[derive(Clone, Debug)]
pub struct AudioChain {
    dc: DcBlocker,
    high_pass: Biquad,
}

impl AudioChain {
    pub fn new(cfg: &FilterConfig, sample_rate: f32) -> Self {
        Self {
            dc: DcBlocker::new(cfg.dc_alpha),
            high_pass: Biquad::new(BiquadCoeffs::high_pass(cfg.audio_high_pass_hz, sample_rate)),
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        if !x.is_finite() {
            return 0.0;
        }
        let y = self.high_pass.process(self.dc.process(x));
        if y.is_finite() {
            y
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.dc.reset();
        self.high_pass.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn chain() -> SignalChain {
        SignalChain::new(&FilterConfig::default(), 1000.0)
    }

    fn steady_state_gain(chain: &mut SignalChain, freq: f32, fs: f32, secs: f32) -> f32 {
        let n = (secs * fs) as usize;
        let mut peak: f32 = 0.0;
        for i in 0..n {
            let t = i as f32 / fs;
            let y = chain.process((2.0 * PI * freq * t).sin());
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn mains_hum_is_suppressed() {
        let gain = steady_state_gain(&mut chain(), 50.0, 1000.0, 4.0);
        assert!(gain < 0.1, "50 Hz gain through ECG chain was {}", gain);
    }

    #[test]
    fn passband_is_near_unity() {
        // 10 Hz sits inside the 0.5-40 Hz band, away from both notches
        let gain = steady_state_gain(&mut chain(), 10.0, 1000.0, 4.0);
        assert!(gain > 0.8, "10 Hz gain through ECG chain was {}", gain);
    }

    #[test]
    fn out_of_band_is_suppressed() {
        let gain = steady_state_gain(&mut chain(), 200.0, 1000.0, 4.0);
        assert!(gain < 0.1, "200 Hz gain through ECG chain was {}", gain);
    }

    #[test]
    fn reset_then_zero_input_is_all_zero() {
        let mut c = chain();
        for i in 0..500 {
            c.process((i % 7) as f32 - 3.0);
        }
        c.reset();
        for _ in 0..500 {
            assert_eq!(c.process(0.0), 0.0);
        }
    }

    #[test]
    fn nan_input_does_not_corrupt_chain() {
        let mut c = chain();
        c.process(1.0);
        assert_eq!(c.process(f32::NAN), 0.0);
        for i in 0..1000 {
            let y = c.process((i as f32 * 0.01).sin());
            assert!(y.is_finite());
        }
    }

    #[test]
    fn audio_chain_blocks_dc() {
        let mut c = AudioChain::new(&FilterConfig::default(), 16_000.0);
        let mut y = 1.0;
        for _ in 0..40_000 {
            y = c.process(1000.0);
        }
        assert!(y.abs() < 1.0, "DC leak through audio chain was {}", y);
    }

    #[test]
    fn chains_do_not_share_state() {
        let mut a = chain();
        let mut b = chain();
        for i in 0..100 {
            a.process(i as f32);
        }
        // b never saw a's samples; zero in, zero out
        for _ in 0..100 {
            assert_eq!(b.process(0.0), 0.0);
        }
    }
}

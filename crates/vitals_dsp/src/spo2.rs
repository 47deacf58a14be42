//! SpO2 and heart-rate estimation from paired (red, ir) PPG samples
//!
//! R-ratio method: `R = (AC_red / DC_red) / (AC_ir / DC_ir)`,
//! `spo2 = cal_intercept - cal_slope * R`. DC is the buffer mean, AC the
//! buffer standard deviation, recomputed on a sample-counted update tick.
//! Heart rate comes from an independent peak-interval tracker on the IR
//! waveform. All timing is derived from the configured sample rate; this
//! module never reads a clock.

use log::debug;
use vitals_types::{FingerConfig, PpgPair, Spo2Config};

/// Finger-presence debounce with asymmetric hysteresis.
///
/// In-range IR samples increment the counter; presence is declared when it
/// reaches `stable_count`. Out-of-range samples decrement rather than clear
/// it, so a single dropped sample is tolerated; presence is revoked only when
/// the counter decays to zero.
#[derive(Clone, Debug)]
pub struct FingerDetector {
    cfg: FingerConfig,
    count: u32,
    present: bool,
}

impl FingerDetector {
    pub fn new(cfg: FingerConfig) -> Self {
        Self {
            cfg,
            count: 0,
            present: false,
        }
    }

    /// Feed one IR sample; returns the updated presence state.
    pub fn update(&mut self, ir: u32) -> bool {
        if ir > self.cfg.ir_threshold {
            self.count = (self.count + 1).min(self.cfg.stable_count);
            if self.count >= self.cfg.stable_count {
                self.present = true;
            }
        } else {
            self.count = self.count.saturating_sub(1);
            if self.count == 0 {
                self.present = false;
            }
        }
        self.present
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.present = false;
    }
}

/// DC/AC statistics from the most recent accumulator contents.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spo2Stats {
    pub red_dc: f32,
    pub red_ac: f32,
    pub ir_dc: f32,
    pub ir_ac: f32,
}

/// Ring-buffer accumulator plus the two estimators that consume it.
pub struct Spo2Estimator {
    cfg: Spo2Config,

    red: Vec<u32>,
    ir: Vec<u32>,
    index: usize,
    count: usize,

    // Sample-counted update tick
    update_interval_samples: u32,
    samples_since_update: u32,
    ms_per_sample: f32,

    stats: Spo2Stats,
    last_spo2: f32,
    smoothed_spo2: f32,

    finger: FingerDetector,
    was_present: bool,

    // Peak tracker state
    sample_index: u64,
    last_peak_index: u64,
    have_peak: bool,
    beat_count: u32,
    peak_threshold: f32,
    last_ir: f32,
    prev_ir: f32,
    last_hr: f32,
    smoothed_hr: f32,
}

impl Spo2Estimator {
    pub fn new(cfg: Spo2Config, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let update_interval_samples =
            (cfg.update_interval_ms as u64 * sample_rate as u64 / 1000).max(1) as u32;
        let finger = FingerDetector::new(cfg.finger.clone());
        Self {
            red: vec![0; cfg.buffer_size],
            ir: vec![0; cfg.buffer_size],
            index: 0,
            count: 0,
            update_interval_samples,
            samples_since_update: 0,
            ms_per_sample: 1000.0 / sample_rate as f32,
            stats: Spo2Stats::default(),
            last_spo2: 0.0,
            smoothed_spo2: 98.0,
            finger,
            was_present: false,
            sample_index: 0,
            last_peak_index: 0,
            have_peak: false,
            beat_count: 0,
            peak_threshold: 0.0,
            last_ir: 0.0,
            prev_ir: 0.0,
            last_hr: 0.0,
            smoothed_hr: 75.0,
            cfg,
        }
    }

    /// Accept one paired sample. Runs the finger debounce and peak tracker
    /// every call, the R-ratio computation only on its update tick.
    pub fn add_sample(&mut self, pair: PpgPair) {
        self.red[self.index] = pair.red;
        self.ir[self.index] = pair.ir;
        self.index = (self.index + 1) % self.red.len();
        if self.count < self.red.len() {
            self.count += 1;
        }

        let present = self.finger.update(pair.ir);
        if self.was_present && !present {
            // Finger removed: stale accumulator contents and peak history
            // would contaminate the next contact
            debug!("finger removed, clearing accumulator");
            self.clear_measurement_state();
        }
        self.was_present = present;

        self.detect_peak(pair.ir);
        self.sample_index += 1;

        self.samples_since_update += 1;
        if self.samples_since_update >= self.update_interval_samples {
            self.samples_since_update = 0;
            self.compute_spo2();
        }
    }

    /// Smoothed SpO2 in percent.
    pub fn spo2(&self) -> f32 {
        self.smoothed_spo2
    }

    /// Last computed (clamped, unsmoothed) SpO2 in percent.
    pub fn raw_spo2(&self) -> f32 {
        self.last_spo2
    }

    /// Smoothed heart rate in BPM.
    pub fn heart_rate(&self) -> f32 {
        self.smoothed_hr
    }

    /// Last accepted instantaneous heart rate in BPM.
    pub fn raw_heart_rate(&self) -> f32 {
        self.last_hr
    }

    pub fn finger_present(&self) -> bool {
        self.finger.is_present()
    }

    pub fn stats(&self) -> Spo2Stats {
        self.stats
    }

    pub fn sample_count(&self) -> usize {
        self.count
    }

    /// Full reset for a new session.
    pub fn reset(&mut self) {
        self.clear_measurement_state();
        self.finger.reset();
        self.was_present = false;
        self.smoothed_spo2 = 98.0;
        self.smoothed_hr = 75.0;
        self.last_spo2 = 0.0;
        self.last_hr = 0.0;
        self.sample_index = 0;
    }

    fn clear_measurement_state(&mut self) {
        self.index = 0;
        self.count = 0;
        self.samples_since_update = 0;
        self.stats = Spo2Stats::default();
        self.have_peak = false;
        self.beat_count = 0;
        self.peak_threshold = 0.0;
        self.last_ir = 0.0;
        self.prev_ir = 0.0;
    }

    fn compute_spo2(&mut self) {
        if !self.finger.is_present() || self.count < self.cfg.min_samples {
            return;
        }

        let n = self.count;
        let mut red_sum = 0u64;
        let mut ir_sum = 0u64;
        for i in 0..n {
            red_sum += self.red[i] as u64;
            ir_sum += self.ir[i] as u64;
        }
        let red_dc = red_sum as f64 / n as f64;
        let ir_dc = ir_sum as f64 / n as f64;

        let mut red_sq = 0.0f64;
        let mut ir_sq = 0.0f64;
        for i in 0..n {
            let rd = self.red[i] as f64 - red_dc;
            let id = self.ir[i] as f64 - ir_dc;
            red_sq += rd * rd;
            ir_sq += id * id;
        }
        let red_ac = (red_sq / n as f64).sqrt();
        let ir_ac = (ir_sq / n as f64).sqrt();

        self.stats = Spo2Stats {
            red_dc: red_dc as f32,
            red_ac: red_ac as f32,
            ir_dc: ir_dc as f32,
            ir_ac: ir_ac as f32,
        };

        // Degenerate signals would blow up the ratio; skip the cycle
        if red_dc < 1.0 || ir_dc < 1.0 || red_ac < 1.0 || ir_ac < 1.0 {
            return;
        }

        let r = ((red_ac / red_dc) / (ir_ac / ir_dc)) as f32;
        let spo2 = self.cfg.cal_intercept - self.cfg.cal_slope * r;
        let (clamp_lo, clamp_hi) = self.cfg.clamp_range;
        let spo2 = spo2.clamp(clamp_lo, clamp_hi);
        self.last_spo2 = spo2;

        // Out-of-physiological-range transients are rejected, not smoothed in
        let (accept_lo, accept_hi) = self.cfg.accept_range;
        if spo2 >= accept_lo && spo2 <= accept_hi {
            let alpha = self.cfg.spo2_smoothing;
            self.smoothed_spo2 = self.smoothed_spo2 * (1.0 - alpha) + spo2 * alpha;
        }
    }

    fn detect_peak(&mut self, ir: u32) {
        if !self.finger.is_present() {
            self.last_ir = 0.0;
            self.prev_ir = 0.0;
            self.have_peak = false;
            self.beat_count = 0;
            return;
        }

        let current = ir as f32;

        // Adaptive threshold trails the IR level
        if self.peak_threshold == 0.0 {
            self.peak_threshold = current;
        } else {
            let decay = self.cfg.peak_threshold_decay;
            self.peak_threshold = self.peak_threshold * decay + current * (1.0 - decay);
        }

        // The previous sample is a peak if it tops both neighbours and the
        // threshold with margin
        if self.last_ir > self.prev_ir
            && self.last_ir > current
            && self.last_ir > self.peak_threshold * (1.0 + self.cfg.peak_margin)
        {
            if self.have_peak {
                let interval_ms =
                    (self.sample_index - self.last_peak_index) as f32 * self.ms_per_sample;
                self.accept_beat(interval_ms);
            }
            self.last_peak_index = self.sample_index;
            self.have_peak = true;
        }

        self.prev_ir = self.last_ir;
        self.last_ir = current;
    }

    fn accept_beat(&mut self, interval_ms: f32) {
        let (min_ms, max_ms) = self.cfg.beat_interval_ms;
        if interval_ms < min_ms as f32 || interval_ms > max_ms as f32 {
            return;
        }

        let instant_bpm = 60_000.0 / interval_ms;
        let (hr_lo, hr_hi) = self.cfg.hr_bounds_bpm;
        if instant_bpm < hr_lo || instant_bpm > hr_hi {
            return;
        }

        // Limit the per-beat step against the smoothed value, except during
        // warm-up where larger jumps let the estimate converge
        let step = (instant_bpm - self.smoothed_hr).abs();
        if step <= self.cfg.hr_max_step_bpm || self.beat_count < self.cfg.hr_warmup_beats {
            self.last_hr = instant_bpm;
            let alpha = self.cfg.hr_smoothing;
            self.smoothed_hr = self.smoothed_hr * (1.0 - alpha) + instant_bpm * alpha;
            self.beat_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const FS: u32 = 1000;

    fn estimator() -> Spo2Estimator {
        Spo2Estimator::new(Spo2Config::default(), FS)
    }

    /// Synthetic (red, ir) pair with sinusoidal AC riding on a DC level.
    fn pair_at(t: f32, red_dc: f32, red_ac: f32, ir_dc: f32, ir_ac: f32, period_s: f32) -> PpgPair {
        let phase = (2.0 * PI * t / period_s).sin();
        PpgPair {
            red: (red_dc + red_ac * phase) as u32,
            ir: (ir_dc + ir_ac * phase) as u32,
        }
    }

    fn feed_seconds(
        est: &mut Spo2Estimator,
        secs: f32,
        red_dc: f32,
        red_ac: f32,
        ir_ac: f32,
        period_s: f32,
    ) {
        let n = (secs * FS as f32) as usize;
        for i in 0..n {
            let t = i as f32 / FS as f32;
            est.add_sample(pair_at(t, red_dc, red_ac, 100_000.0, ir_ac, period_s));
        }
    }

    #[test]
    fn debounce_requires_full_stable_run() {
        let cfg = FingerConfig {
            ir_threshold: 50_000,
            stable_count: 50,
        };
        let mut detector = FingerDetector::new(cfg);

        // stable_count - 1 in-range samples, then one miss: must stay absent
        for _ in 0..49 {
            detector.update(60_000);
        }
        assert!(!detector.is_present());
        detector.update(10_000);
        assert!(!detector.is_present());
    }

    #[test]
    fn debounce_declares_presence_after_stable_count() {
        let cfg = FingerConfig {
            ir_threshold: 50_000,
            stable_count: 50,
        };
        let mut detector = FingerDetector::new(cfg);
        for _ in 0..50 {
            detector.update(60_000);
        }
        assert!(detector.is_present());
    }

    #[test]
    fn debounce_tolerates_single_dropped_sample() {
        let cfg = FingerConfig {
            ir_threshold: 50_000,
            stable_count: 50,
        };
        let mut detector = FingerDetector::new(cfg);
        for _ in 0..50 {
            detector.update(60_000);
        }
        // One miss decrements but does not revoke
        detector.update(10_000);
        assert!(detector.is_present());
        // A sustained run of misses does
        for _ in 0..50 {
            detector.update(10_000);
        }
        assert!(!detector.is_present());
    }

    #[test]
    fn known_r_ratio_yields_expected_spo2() {
        // red_ac/red_dc = 8000/100000, ir_ac/ir_dc = 10000/100000 -> R = 0.8
        // spo2 = 110 - 25 * 0.8 = 90
        let mut est = estimator();
        feed_seconds(&mut est, 5.0, 100_000.0, 8_000.0, 10_000.0, 0.75);
        assert!(
            (est.raw_spo2() - 90.0).abs() < 2.0,
            "raw spo2 was {}",
            est.raw_spo2()
        );
    }

    #[test]
    fn low_r_clamps_at_upper_bound() {
        // R = 0.4 -> formula gives exactly 100, the upper clamp
        let mut est = estimator();
        feed_seconds(&mut est, 5.0, 100_000.0, 4_000.0, 10_000.0, 0.75);
        assert!(
            (est.raw_spo2() - 100.0).abs() < 1.5,
            "raw spo2 was {}",
            est.raw_spo2()
        );
        assert!(est.raw_spo2() <= 100.0);
    }

    #[test]
    fn high_r_clamps_at_lower_bound() {
        // R = 1.6 -> formula gives 70 after clamping
        let mut est = estimator();
        feed_seconds(&mut est, 5.0, 100_000.0, 16_000.0, 10_000.0, 0.75);
        assert!(
            (est.raw_spo2() - 70.0).abs() < 2.0,
            "raw spo2 was {}",
            est.raw_spo2()
        );
        // 70 is outside the accept range, so the smoothed output must not
        // have chased it
        assert!(est.spo2() > 90.0, "smoothed spo2 chased a transient");
    }

    #[test]
    fn heart_rate_converges_on_synthetic_80_bpm() {
        // 750 ms period = 80 BPM. Run at 100 Hz so the sine curvature spans
        // whole ADC counts and each cycle has a single unambiguous maximum.
        let fs = 100u32;
        let mut est = Spo2Estimator::new(Spo2Config::default(), fs);
        for i in 0..(90 * fs) {
            let t = i as f32 / fs as f32;
            est.add_sample(pair_at(t, 100_000.0, 8_000.0, 100_000.0, 20_000.0, 0.75));
        }
        assert!(
            (est.heart_rate() - 80.0).abs() <= 3.0,
            "smoothed HR was {}",
            est.heart_rate()
        );
        assert!(
            (est.raw_heart_rate() - 80.0).abs() <= 2.0,
            "instant HR was {}",
            est.raw_heart_rate()
        );
    }

    #[test]
    fn no_finger_means_no_estimates() {
        let mut est = estimator();
        // IR below the finger threshold: nothing should be computed
        for i in 0..(3 * FS) {
            let t = i as f32 / FS as f32;
            est.add_sample(pair_at(t, 30_000.0, 3_000.0, 30_000.0, 3_000.0, 0.75));
        }
        assert!(!est.finger_present());
        assert_eq!(est.raw_spo2(), 0.0);
    }

    #[test]
    fn reset_restores_initial_outputs() {
        let mut est = estimator();
        feed_seconds(&mut est, 5.0, 100_000.0, 8_000.0, 10_000.0, 0.75);
        est.reset();
        assert_eq!(est.sample_count(), 0);
        assert!(!est.finger_present());
        assert_eq!(est.raw_spo2(), 0.0);
        assert!((est.spo2() - 98.0).abs() < f32::EPSILON);
        assert!((est.heart_rate() - 75.0).abs() < f32::EPSILON);
    }

    #[test]
    fn degenerate_flat_signal_skips_computation() {
        let mut est = estimator();
        // Perfectly flat IR/red above the finger threshold: AC is zero, the
        // R-ratio cycle must be skipped rather than divide by ~0
        for _ in 0..(5 * FS) {
            est.add_sample(PpgPair {
                red: 100_000,
                ir: 100_000,
            });
        }
        assert!(est.finger_present());
        assert_eq!(est.raw_spo2(), 0.0);
        assert!((est.spo2() - 98.0).abs() < f32::EPSILON);
    }
}

//! Haar wavelet denoising
//!
//! Two forms share the same forward/inverse transform:
//! [`BatchDenoiser`] runs a full multi-level decomposition with a universal
//! threshold over a power-of-two buffer with 50 % overlap, and
//! [`RealTimeDenoiser`] runs a fixed 2-level decomposition over a short
//! sliding window so every input sample produces one output sample.

use vitals_types::WaveletConfig;

use crate::error::DspError;

const SQRT2: f32 = std::f32::consts::SQRT_2;

/// One level of Haar decomposition. `approx` and `detail` each receive
/// `signal.len() / 2` coefficients.
pub fn haar_forward(signal: &[f32], approx: &mut [f32], detail: &mut [f32]) {
    let half = signal.len() / 2;
    for i in 0..half {
        let s1 = signal[2 * i];
        let s2 = signal[2 * i + 1];
        approx[i] = (s1 + s2) / SQRT2;
        detail[i] = (s1 - s2) / SQRT2;
    }
}

/// Inverse of [`haar_forward`]: rebuilds `2 * approx.len()` samples.
pub fn haar_inverse(approx: &[f32], detail: &[f32], signal: &mut [f32]) {
    for i in 0..approx.len() {
        let a = approx[i];
        let d = detail[i];
        signal[2 * i] = (a + d) / SQRT2;
        signal[2 * i + 1] = (a - d) / SQRT2;
    }
}

/// Shrink toward zero: `sign(x) * max(|x| - threshold, 0)`.
fn soft_threshold(x: f32, threshold: f32) -> f32 {
    if x > threshold {
        x - threshold
    } else if x < -threshold {
        x + threshold
    } else {
        0.0
    }
}

/// Universal threshold `sigma * sqrt(2 ln n)` from a standard-deviation
/// estimate of the detail coefficients, scaled by the configured multiplier.
fn universal_threshold(detail: &[f32], multiplier: f32) -> f32 {
    let n = detail.len();
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    for &d in detail {
        sum += d;
        sum_sq += d * d;
    }
    let mean = sum / n as f32;
    let variance = (sum_sq / n as f32) - mean * mean;
    let sigma = variance.max(0.0).sqrt();
    sigma * (2.0 * (n as f32).ln()).sqrt() * multiplier
}

/// Full-buffer Haar denoiser.
///
/// Collects `buffer_size` samples, decomposes `levels` deep, soft-thresholds
/// each level's details with a universal threshold, reconstructs, then keeps
/// the newest half of the buffer (50 % overlap) to reduce edge artifacts.
pub struct BatchDenoiser {
    levels: usize,
    multiplier: f32,

    buffer: Vec<f32>,
    index: usize,
    collected: usize,

    // Scratch for decomposition/reconstruction, allocated once
    working: Vec<f32>,
    approx: Vec<f32>,
    detail: Vec<f32>,
    level_details: Vec<Vec<f32>>,

    denoised: Vec<f32>,
    out_index: usize,
    ready: bool,
}

impl BatchDenoiser {
    /// Fails on any window/level combination that would misalign the
    /// transform; the system refuses to start rather than silently truncate.
    pub fn new(cfg: &WaveletConfig) -> Result<Self, DspError> {
        let n = cfg.buffer_size;
        if n == 0 || !n.is_power_of_two() {
            return Err(DspError::ConfigurationError(format!(
                "wavelet buffer size {} is not a power of two",
                n
            )));
        }
        if cfg.levels == 0 {
            return Err(DspError::ConfigurationError(
                "wavelet level count must be at least 1".to_string(),
            ));
        }
        if n % (1usize << cfg.levels) != 0 {
            return Err(DspError::ConfigurationError(format!(
                "wavelet buffer size {} is not divisible by 2^{}",
                n, cfg.levels
            )));
        }

        Ok(Self {
            levels: cfg.levels,
            multiplier: cfg.threshold_multiplier,
            buffer: vec![0.0; n],
            index: 0,
            collected: 0,
            working: vec![0.0; n],
            approx: vec![0.0; n / 2],
            detail: vec![0.0; n / 2],
            level_details: (0..cfg.levels).map(|l| vec![0.0; n >> (l + 1)]).collect(),
            denoised: vec![0.0; n],
            out_index: 0,
            ready: false,
        })
    }

    /// Buffer one sample. Returns true once a denoised block is available to
    /// drain through [`Self::next_denoised`].
    pub fn push(&mut self, sample: f32) -> bool {
        let n = self.buffer.len();
        self.buffer[self.index] = if sample.is_finite() { sample } else { 0.0 };
        self.index = (self.index + 1) % n;
        self.collected += 1;

        if self.collected >= n {
            self.process_buffer();
            // Keep the newest half resident so consecutive batches overlap
            self.collected = n / 2;
        }
        self.ready
    }

    /// Next denoised sample of the current block, oldest first.
    pub fn next_denoised(&mut self) -> Option<f32> {
        if !self.ready {
            return None;
        }
        let sample = self.denoised[self.out_index];
        self.out_index += 1;
        if self.out_index >= self.denoised.len() {
            self.ready = false;
            self.out_index = 0;
        }
        Some(sample)
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.collected = 0;
        self.out_index = 0;
        self.ready = false;
        self.buffer.fill(0.0);
        self.denoised.fill(0.0);
    }

    fn process_buffer(&mut self) {
        let n = self.buffer.len();

        // Oldest-first copy of the circular buffer
        for i in 0..n {
            self.working[i] = self.buffer[(self.index + i) % n];
        }

        // Forward transform, capturing details per level
        let mut len = n;
        for level in 0..self.levels {
            let half = len / 2;
            haar_forward(
                &self.working[..len],
                &mut self.approx[..half],
                &mut self.detail[..half],
            );
            self.level_details[level][..half].copy_from_slice(&self.detail[..half]);
            self.working[..half].copy_from_slice(&self.approx[..half]);
            len = half;
        }

        // Threshold each level's details independently
        for details in &mut self.level_details {
            let threshold = universal_threshold(details, self.multiplier);
            for d in details.iter_mut() {
                *d = soft_threshold(*d, threshold);
            }
        }

        // Reconstruct from the deepest approximation upward
        for level in (0..self.levels).rev() {
            let half = n >> (level + 1);
            self.approx[..half].copy_from_slice(&self.working[..half]);
            haar_inverse(
                &self.approx[..half],
                &self.level_details[level][..half],
                &mut self.working[..half * 2],
            );
        }

        self.denoised.copy_from_slice(&self.working);
        self.ready = true;
        self.out_index = 0;
    }
}

/// Sliding-window denoiser cheap enough to run at the sampling rate.
///
/// Holds 16 samples; each input runs a 2-level decomposition over the most
/// recent 8, thresholds details by their mean magnitude, reconstructs and
/// emits the window-center sample. O(1) work per sample at the cost of a
/// fixed small delay.
pub struct RealTimeDenoiser {
    buffer: [f32; 16],
    index: usize,
    multiplier: f32,
}

impl RealTimeDenoiser {
    pub fn new(threshold_multiplier: f32) -> Self {
        Self {
            buffer: [0.0; 16],
            index: 0,
            multiplier: threshold_multiplier,
        }
    }

    pub fn reset(&mut self) {
        self.buffer = [0.0; 16];
        self.index = 0;
    }

    /// Denoise one sample. Degraded-but-alive: a non-finite reconstruction
    /// falls back to `sample * 0.5` instead of propagating the fault.
    pub fn process(&mut self, sample: f32) -> f32 {
        let sample = if sample.is_finite() { sample } else { 0.0 };
        self.buffer[self.index] = sample;

        // Most recent 8 samples, oldest first
        let mut s = [0.0f32; 8];
        let mut idx = self.index;
        for i in (0..8).rev() {
            s[i] = self.buffer[idx];
            idx = (idx + 16 - 1) % 16;
        }

        // Level 1
        let mut a1 = [0.0f32; 4];
        let mut d1 = [0.0f32; 4];
        haar_forward(&s, &mut a1, &mut d1);

        // Level 2
        let mut a2 = [0.0f32; 2];
        let mut d2 = [0.0f32; 2];
        haar_forward(&a1, &mut a2, &mut d2);

        // Adaptive threshold from the mean detail magnitude
        let sum_abs: f32 = d1.iter().chain(d2.iter()).map(|d| d.abs()).sum();
        let threshold = sum_abs / 6.0 * self.multiplier;

        for d in d1.iter_mut() {
            *d = soft_threshold(*d, threshold);
        }
        for d in d2.iter_mut() {
            *d = soft_threshold(*d, threshold * 0.7);
        }

        let mut ra1 = [0.0f32; 4];
        haar_inverse(&a2, &d2, &mut ra1);
        let mut rs = [0.0f32; 8];
        haar_inverse(&ra1, &d1, &mut rs);

        self.index = (self.index + 1) % 16;

        let out = rs[4];
        if out.is_finite() {
            out
        } else {
            sample * 0.5
        }
    }
}

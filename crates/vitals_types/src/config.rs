//! Configuration types shared by the DSP core, the acquisition adapters and
//! the daemon.
//!
//! Defaults mirror the shipped sensor tuning: 1000 Hz ECG/PPG, 16 kHz audio,
//! 50/100 Hz notches at Q=30, a 0.5–40 Hz bandpass, a 128-sample level-3
//! wavelet buffer and a 200-pair SpO2 accumulator.

use serde::{Deserialize, Serialize};

/// ECG acquisition channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgConfig {
    /// Timer-driven sample rate in Hz.
    pub sample_rate: u32,
    /// Capacity of the sampler-to-processing ring buffer.
    #[serde(default = "default_ecg_ring_capacity")]
    pub ring_capacity: usize,
}

fn default_ecg_ring_capacity() -> usize {
    512
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1000,
            ring_capacity: default_ecg_ring_capacity(),
        }
    }
}

/// PPG (pulse oximetry) acquisition channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpgConfig {
    /// Effective paired-sample rate in Hz after the sensor's own averaging.
    pub sample_rate: u32,
    /// Capacity of the FIFO-drain handoff queue.
    #[serde(default = "default_ppg_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_ppg_queue_capacity() -> usize {
    512
}

impl Default for PpgConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1000,
            queue_capacity: default_ppg_queue_capacity(),
        }
    }
}

/// Audio (body-sound) acquisition channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Native microphone sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per block read from the driver.
    #[serde(default = "default_audio_block_size")]
    pub block_size: usize,
    /// Raw samples averaged into one sample before filtering. 1 disables
    /// downsampling.
    #[serde(default = "default_audio_average_window")]
    pub average_window: usize,
}

fn default_audio_block_size() -> usize {
    512
}

fn default_audio_average_window() -> usize {
    4
}

impl AudioConfig {
    /// Rate at which averaged samples enter the audio filter chain.
    pub fn effective_rate(&self) -> f32 {
        self.sample_rate as f32 / self.average_window.max(1) as f32
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            block_size: default_audio_block_size(),
            average_window: default_audio_average_window(),
        }
    }
}

/// Tuning for the ECG/PPG filter chain and the audio chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// First mains notch center frequency in Hz.
    pub notch_freq_hz: f32,
    /// Harmonic notch center frequency in Hz.
    pub notch_harmonic_hz: f32,
    /// Q factor for both notches (high Q keeps the notch narrow).
    pub notch_q: f32,
    /// Bandpass low cutoff in Hz.
    pub band_low_hz: f32,
    /// Bandpass high cutoff in Hz.
    pub band_high_hz: f32,
    /// DC blocker pole (must be < 1).
    pub dc_alpha: f32,
    /// Audio chain high-pass cutoff in Hz.
    #[serde(default = "default_audio_high_pass_hz")]
    pub audio_high_pass_hz: f32,
}

fn default_audio_high_pass_hz() -> f32 {
    80.0
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            notch_freq_hz: 50.0,
            notch_harmonic_hz: 100.0,
            notch_q: 30.0,
            band_low_hz: 0.5,
            band_high_hz: 40.0,
            dc_alpha: 0.995,
            audio_high_pass_hz: default_audio_high_pass_hz(),
        }
    }
}

/// Tuning for the batch and real-time wavelet denoisers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveletConfig {
    /// Batch buffer length. Must be a power of two and divisible by
    /// `2^levels`; construction fails otherwise.
    pub buffer_size: usize,
    /// Decomposition depth for the batch denoiser.
    pub levels: usize,
    /// Scales both the universal threshold (batch) and the adaptive
    /// threshold (real-time).
    pub threshold_multiplier: f32,
}

impl Default for WaveletConfig {
    fn default() -> Self {
        Self {
            buffer_size: 128,
            levels: 3,
            threshold_multiplier: 1.5,
        }
    }
}

/// Finger-presence debounce.
///
/// The hysteresis is asymmetric on purpose: the counter climbs by one per
/// in-range IR sample and presence is declared only once it reaches
/// `stable_count`, but an out-of-range sample merely decrements it, so a
/// single dropped sample does not revoke presence. Presence is revoked when
/// the counter decays back to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerConfig {
    /// IR level above which a sample counts as finger-on.
    pub ir_threshold: u32,
    /// Consecutive in-range samples required to declare presence.
    pub stable_count: u32,
}

impl Default for FingerConfig {
    fn default() -> Self {
        Self {
            ir_threshold: 50_000,
            stable_count: 50,
        }
    }
}

/// Tuning for the SpO2 / heart-rate estimator.
///
/// The linear calibration (`spo2 = cal_intercept - cal_slope * R`) is an
/// empirical fit, not a physiological constant, so both terms are exposed
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spo2Config {
    /// Capacity of the (red, ir) ring accumulator.
    pub buffer_size: usize,
    /// Minimum buffered pairs before the first computation.
    pub min_samples: usize,
    /// Interval between R-ratio recomputations, in milliseconds of PPG time.
    pub update_interval_ms: u32,
    /// Linear calibration intercept.
    #[serde(default = "default_cal_intercept")]
    pub cal_intercept: f32,
    /// Linear calibration slope.
    #[serde(default = "default_cal_slope")]
    pub cal_slope: f32,
    /// Hard output clamp, percent.
    #[serde(default = "default_spo2_clamp")]
    pub clamp_range: (f32, f32),
    /// Only values inside this range feed the smoothed output.
    #[serde(default = "default_spo2_accept")]
    pub accept_range: (f32, f32),
    /// EMA factor for the smoothed SpO2 output.
    pub spo2_smoothing: f32,
    /// EMA factor for the smoothed heart-rate output.
    pub hr_smoothing: f32,
    /// Largest accepted jump of instantaneous BPM from the smoothed value.
    pub hr_max_step_bpm: f32,
    /// Plausible heart-rate band in BPM.
    #[serde(default = "default_hr_bounds")]
    pub hr_bounds_bpm: (f32, f32),
    /// Beats during which the step limit is waived to converge faster.
    #[serde(default = "default_hr_warmup_beats")]
    pub hr_warmup_beats: u32,
    /// Valid inter-peak interval in milliseconds.
    #[serde(default = "default_beat_interval_ms")]
    pub beat_interval_ms: (u32, u32),
    /// Per-sample decay of the adaptive peak threshold.
    #[serde(default = "default_peak_threshold_decay")]
    pub peak_threshold_decay: f32,
    /// A peak must exceed threshold * (1 + margin).
    #[serde(default = "default_peak_margin")]
    pub peak_margin: f32,
    /// Finger-presence debounce.
    #[serde(default)]
    pub finger: FingerConfig,
}

fn default_cal_intercept() -> f32 {
    110.0
}

fn default_cal_slope() -> f32 {
    25.0
}

fn default_spo2_clamp() -> (f32, f32) {
    (70.0, 100.0)
}

fn default_spo2_accept() -> (f32, f32) {
    (85.0, 100.0)
}

fn default_hr_bounds() -> (f32, f32) {
    (40.0, 200.0)
}

fn default_hr_warmup_beats() -> u32 {
    3
}

fn default_beat_interval_ms() -> (u32, u32) {
    (300, 1500)
}

fn default_peak_threshold_decay() -> f32 {
    0.99
}

fn default_peak_margin() -> f32 {
    0.001
}

impl Default for Spo2Config {
    fn default() -> Self {
        Self {
            buffer_size: 200,
            min_samples: 100,
            update_interval_ms: 500,
            cal_intercept: default_cal_intercept(),
            cal_slope: default_cal_slope(),
            clamp_range: default_spo2_clamp(),
            accept_range: default_spo2_accept(),
            spo2_smoothing: 0.05,
            hr_smoothing: 0.05,
            hr_max_step_bpm: 15.0,
            hr_bounds_bpm: default_hr_bounds(),
            hr_warmup_beats: default_hr_warmup_beats(),
            beat_interval_ms: default_beat_interval_ms(),
            peak_threshold_decay: default_peak_threshold_decay(),
            peak_margin: default_peak_margin(),
            finger: FingerConfig::default(),
        }
    }
}

/// Output sink pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Emit every Nth sample per waveform channel. Fixed at configuration
    /// time, never negotiated.
    pub decimation: u32,
    /// Interval between runtime/rate/summary lines, in milliseconds.
    pub stats_interval_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            decimation: 10,
            stats_interval_ms: 1000,
        }
    }
}

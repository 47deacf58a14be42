//! Real-time DSP core for the vitals daemon
//!
//! Sample-by-sample processing shared by every acquisition channel: biquad
//! IIR sections, the fixed ECG/PPG and audio filter chains, Haar wavelet
//! denoising (batch and low-latency), and the SpO2 / heart-rate estimator.
//!
//! Nothing in this crate blocks, allocates after construction, or reads a
//! clock; rate-limited logic counts samples against the configured rates.

pub mod biquad;
pub mod chain;
pub mod error;
pub mod spo2;
pub mod wavelet;

pub use biquad::{Biquad, BiquadCoeffs, BUTTERWORTH_Q};
pub use chain::{AudioChain, DcBlocker, SignalChain};
pub use error::DspError;
pub use spo2::{FingerDetector, Spo2Estimator, Spo2Stats};
pub use wavelet::{haar_forward, haar_inverse, BatchDenoiser, RealTimeDenoiser};

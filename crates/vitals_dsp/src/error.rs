use thiserror::Error;

/// Errors raised while constructing DSP components.
///
/// Configuration violations are fatal at initialization time; steady-state
/// processing never fails, it recovers locally (see the per-module
/// NaN/Infinity handling).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

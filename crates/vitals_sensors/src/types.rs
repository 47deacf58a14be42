//! Common types and traits for sensor drivers

use thiserror::Error;
use vitals_types::{EcgReading, PpgPair, SensorError};

/// Status of a sensor driver
#[derive(Debug, Clone, PartialEq)]
pub enum DriverStatus {
    /// Driver is not initialized
    NotInitialized,
    /// Driver is initialized but not running
    Stopped,
    /// Driver is actively acquiring data
    Running,
    /// Driver encountered an error
    Error(String),
}

/// Errors that can occur in sensor drivers
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// A sensor-specific error.
    #[error("Sensor error: {0}")]
    SensorError(#[from] SensorError),
    /// Hardware communication error
    #[error("Hardware error: {0}")]
    HardwareError(String),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Hardware not found
    #[error("Hardware not found: {0}")]
    HardwareNotFound(String),
    /// Driver not initialized
    #[error("Driver not initialized")]
    NotInitialized,
    /// Acquisition error
    #[error("Acquisition error: {0}")]
    AcquisitionError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::IoError(err.to_string())
    }
}

/// Analog ECG front-end.
///
/// `read_sample` is called from the timer-driven sampling context: it must
/// perform a single conversion and return, never block, never allocate.
pub trait EcgDriver: Send + 'static {
    /// Initialize the driver and underlying hardware.
    fn initialize(&mut self) -> Result<(), DriverError>;

    /// One conversion plus the synchronously sampled lead-off pair.
    fn read_sample(&mut self) -> Result<EcgReading, DriverError>;

    /// Get current driver status
    fn status(&self) -> DriverStatus;

    /// Shutdown the driver and clean up resources
    fn shutdown(&mut self) -> Result<(), DriverError>;
}

/// Pulse-oximetry sensor with an internal FIFO.
///
/// The draining contract: call `check` to pull new FIFO contents into the
/// driver, then consume with `available`/`next` until empty. Multiple pairs
/// may arrive between processing cycles; all must be drained.
pub trait PpgDriver: Send + 'static {
    /// Initialize the driver and underlying hardware.
    fn initialize(&mut self) -> Result<(), DriverError>;

    /// Poll the sensor and transfer any new FIFO samples into the driver.
    fn check(&mut self) -> Result<(), DriverError>;

    /// Pairs currently buffered in the driver.
    fn available(&self) -> usize;

    /// Pop the oldest buffered pair.
    fn next(&mut self) -> Option<PpgPair>;

    /// Get current driver status
    fn status(&self) -> DriverStatus;

    /// Shutdown the driver and clean up resources
    fn shutdown(&mut self) -> Result<(), DriverError>;
}

/// Digital (I2S-style) microphone.
///
/// Wide samples are delivered already shifted into a usable range. The read
/// blocks until a frame is available; all waiting happens here in the
/// adapter, never in the processing core.
pub trait AudioDriver: Send + 'static {
    /// Initialize the driver and underlying hardware.
    fn initialize(&mut self) -> Result<(), DriverError>;

    /// Fill `buf` with up to one frame of samples; returns the count read.
    fn read_block(&mut self, buf: &mut [i32]) -> Result<usize, DriverError>;

    /// Get current driver status
    fn status(&self) -> DriverStatus;

    /// Shutdown the driver and clean up resources
    fn shutdown(&mut self) -> Result<(), DriverError>;
}

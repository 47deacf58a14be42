use serde::{Deserialize, Serialize};

/// Represents errors that can occur within a sensor driver.
///
/// These errors are intended to be propagated to the daemon to provide
/// feedback on the state of the hardware. A failed channel is skipped, never
/// retried from inside the processing core.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SensorError {
    /// A hardware-related fault.
    #[error("Sensor hardware fault: {0}")]
    HardwareFault(String),
    /// The internal buffer was overrun.
    #[error("Sensor buffer overrun")]
    BufferOverrun,
    /// The sensor was disconnected.
    #[error("Sensor disconnected")]
    Disconnected,
    /// A driver-level error.
    #[error("Driver error: {0}")]
    DriverError(String),
}

//! Driver selection
//!
//! Real front-ends live in a board support package that is not part of this
//! workspace; without `--mock` every build-time channel resolves to
//! hardware-not-found and the session skips it, which is exactly the
//! sensor-absent path: report upward, no synthetic substitute, no retry.

use vitals_sensors::mock::{MockAudio, MockEcg, MockPpg};
use vitals_sensors::{AudioDriver, DriverError, EcgDriver, PpgDriver};
use vitals_types::{AudioConfig, EcgConfig, PpgConfig};

pub fn build_ecg_driver(mock: bool, cfg: &EcgConfig) -> Result<Box<dyn EcgDriver>, DriverError> {
    if mock {
        let mut driver = MockEcg::new(cfg.sample_rate);
        driver.initialize()?;
        Ok(Box::new(driver))
    } else {
        Err(DriverError::HardwareNotFound(
            "no ECG board support compiled into this build".to_string(),
        ))
    }
}

pub fn build_ppg_driver(mock: bool, cfg: &PpgConfig) -> Result<Box<dyn PpgDriver>, DriverError> {
    if mock {
        let mut driver = MockPpg::new(cfg.sample_rate);
        driver.initialize()?;
        Ok(Box::new(driver))
    } else {
        Err(DriverError::HardwareNotFound(
            "no pulse-oximetry board support compiled into this build".to_string(),
        ))
    }
}

pub fn build_audio_driver(
    mock: bool,
    cfg: &AudioConfig,
) -> Result<Box<dyn AudioDriver>, DriverError> {
    if mock {
        let mut driver = MockAudio::new(cfg);
        driver.initialize()?;
        Ok(Box::new(driver))
    } else {
        Err(DriverError::HardwareNotFound(
            "no microphone board support compiled into this build".to_string(),
        ))
    }
}

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vitals_types::{
    AudioConfig, EcgConfig, FilterConfig, OutputConfig, PpgConfig, Spo2Config, WaveletConfig,
};

/// Which acquisition channels this run wires up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelToggles {
    pub ecg: bool,
    pub ppg: bool,
    pub audio: bool,
}

impl Default for ChannelToggles {
    fn default() -> Self {
        Self {
            ecg: true,
            ppg: true,
            audio: true,
        }
    }
}

/// Configuration for the daemon
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub channels: ChannelToggles,
    #[serde(default)]
    pub ecg: EcgConfig,
    #[serde(default)]
    pub ppg: PpgConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub wavelet: WaveletConfig,
    #[serde(default)]
    pub spo2: Spo2Config,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Load daemon configuration from file, or fall back to defaults when the
/// file does not exist. A present-but-invalid file is an error: refusing to
/// start beats running with half-parsed tuning.
pub fn load_config(path: &str) -> anyhow::Result<DaemonConfig> {
    if !Path::new(path).exists() {
        tracing::warn!("no configuration file at '{}', using defaults", path);
        return Ok(DaemonConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("could not read configuration file at '{}'", path))?;
    let config: DaemonConfig = serde_json::from_str(&contents)
        .with_context(|| format!("could not parse configuration file at '{}'", path))?;
    tracing::info!("loaded configuration from {}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_shipped_tuning() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.ecg.sample_rate, 1000);
        assert_eq!(cfg.ppg.sample_rate, 1000);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.wavelet.buffer_size, 128);
        assert_eq!(cfg.output.decimation, 10);
        assert!(cfg.channels.ecg && cfg.channels.ppg && cfg.channels.audio);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config("/nonexistent/vitals-config.json").unwrap();
        assert_eq!(cfg.ecg.sample_rate, 1000);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"channels": {{"ecg": true, "ppg": false, "audio": false}}, "ecg": {{"sample_rate": 500}}}}"#
        )
        .unwrap();
        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.ecg.sample_rate, 500);
        assert!(!cfg.channels.ppg);
        // Untouched sections keep their defaults
        assert_eq!(cfg.filter.notch_freq_hz, 50.0);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(load_config(file.path().to_str().unwrap()).is_err());
    }
}

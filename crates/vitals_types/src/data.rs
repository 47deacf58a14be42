use serde::{Deserialize, Serialize};

/// Identifies the source of a scalar sample.
///
/// Samples are never shared across channels; an adapter produces a value for
/// exactly one channel and the matching processing context consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Ecg,
    PpgIr,
    PpgRed,
    Audio,
}

impl Channel {
    /// Stable lowercase name used in plot-line output.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Ecg => "ecg",
            Channel::PpgIr => "ppg_ir",
            Channel::PpgRed => "ppg_red",
            Channel::Audio => "audio",
        }
    }
}

/// One ECG sample with the lead-off detection pair read synchronously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EcgReading {
    /// Raw ADC value from the analog front-end.
    pub raw: i32,
    /// Positive electrode detached.
    pub lead_off_p: bool,
    /// Negative electrode detached.
    pub lead_off_n: bool,
}

impl EcgReading {
    /// Either electrode detached. Processing emits a placeholder while true.
    pub fn lead_off(&self) -> bool {
        self.lead_off_p || self.lead_off_n
    }
}

/// One paired pulse-oximetry reading pulled from the sensor FIFO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpgPair {
    pub red: u32,
    pub ir: u32,
}

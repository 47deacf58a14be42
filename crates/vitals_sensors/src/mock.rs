//! Stubbed-out drivers that generate synthetic physiology
//!
//! Used by the daemon's `--mock` mode and by the test suite. Waveforms are
//! deterministic (sample-counter phase) with a little additive noise so the
//! downstream filters and estimators see realistic texture. Pacing against
//! wall time lives here in the adapters; the processing core stays
//! clock-free.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::time::{Duration, Instant};

use log::info;
use rand::Rng;
use vitals_types::{AudioConfig, EcgReading, PpgPair};

use crate::types::{AudioDriver, DriverError, DriverStatus, EcgDriver, PpgDriver};

/// Sensor-side FIFO depth of the emulated pulse-oximetry chip.
const PPG_FIFO_DEPTH: usize = 32;

/// Synthetic AD8232-style ECG front-end.
///
/// Mid-scale baseline with a 72 BPM R-wave spike train, a little mains hum
/// and white noise. Leads are attached unless told otherwise.
pub struct MockEcg {
    sample_rate: u32,
    n: u64,
    lead_off: bool,
    status: DriverStatus,
}

impl MockEcg {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            n: 0,
            lead_off: false,
            status: DriverStatus::NotInitialized,
        }
    }

    /// Simulate electrode detach/reattach.
    pub fn set_lead_off(&mut self, lead_off: bool) {
        self.lead_off = lead_off;
    }
}

impl EcgDriver for MockEcg {
    fn initialize(&mut self) -> Result<(), DriverError> {
        info!("MockEcg initialized at {} Hz", self.sample_rate);
        self.status = DriverStatus::Running;
        Ok(())
    }

    fn read_sample(&mut self) -> Result<EcgReading, DriverError> {
        if self.status != DriverStatus::Running {
            return Err(DriverError::NotInitialized);
        }
        let t = self.n as f32 / self.sample_rate as f32;
        self.n += 1;

        // 72 BPM spike train over a mid-scale baseline
        let beat_phase = (t * 1.2).fract();
        let spike = if beat_phase < 0.05 {
            (beat_phase / 0.05 * PI).sin() * 800.0
        } else {
            0.0
        };
        let hum = 40.0 * (2.0 * PI * 50.0 * t).sin();
        let noise = rand::thread_rng().gen_range(-15.0..15.0);
        let raw = (2048.0 + spike + hum + noise) as i32;

        Ok(EcgReading {
            raw,
            lead_off_p: self.lead_off,
            lead_off_n: false,
        })
    }

    fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        self.status = DriverStatus::Stopped;
        Ok(())
    }
}

/// Synthetic pulse-oximetry sensor with an emulated internal FIFO.
///
/// `check` advances an elapsed-time cursor and refills the FIFO with however
/// many pairs the sensor would have produced since the last poll, capped at
/// the FIFO depth exactly like the real chip.
pub struct MockPpg {
    sample_rate: u32,
    n: u64,
    fifo: VecDeque<PpgPair>,
    started: Option<Instant>,
    status: DriverStatus,
}

impl MockPpg {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            n: 0,
            fifo: VecDeque::with_capacity(PPG_FIFO_DEPTH),
            started: None,
            status: DriverStatus::NotInitialized,
        }
    }

    fn synthesize(&self, n: u64) -> PpgPair {
        let t = n as f32 / self.sample_rate as f32;
        // 80 BPM pulsatile waveform; AC ratio tuned for ~98 % SpO2
        let phase = (2.0 * PI * t / 0.75).sin();
        let mut rng = rand::thread_rng();
        let ir = 100_000.0 + 15_000.0 * phase + rng.gen_range(-200.0..200.0);
        let red = 100_000.0 + 7_200.0 * phase + rng.gen_range(-200.0..200.0);
        PpgPair {
            red: red as u32,
            ir: ir as u32,
        }
    }
}

impl PpgDriver for MockPpg {
    fn initialize(&mut self) -> Result<(), DriverError> {
        info!("MockPpg initialized at {} Hz", self.sample_rate);
        self.status = DriverStatus::Running;
        self.started = Some(Instant::now());
        self.n = 0;
        Ok(())
    }

    fn check(&mut self) -> Result<(), DriverError> {
        let started = self.started.ok_or(DriverError::NotInitialized)?;
        let due = (started.elapsed().as_secs_f64() * self.sample_rate as f64) as u64;
        while self.n < due {
            if self.fifo.len() >= PPG_FIFO_DEPTH {
                // FIFO overrun: the chip overwrites its oldest entry
                self.fifo.pop_front();
            }
            let pair = self.synthesize(self.n);
            self.fifo.push_back(pair);
            self.n += 1;
        }
        Ok(())
    }

    fn available(&self) -> usize {
        self.fifo.len()
    }

    fn next(&mut self) -> Option<PpgPair> {
        self.fifo.pop_front()
    }

    fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        self.status = DriverStatus::Stopped;
        Ok(())
    }
}

/// Synthetic I2S microphone delivering paced frames.
///
/// Emits a low tone plus noise; `read_block` sleeps until the frame its
/// sample counter points at would have been filled by the real DMA engine.
pub struct MockAudio {
    sample_rate: u32,
    block_size: usize,
    n: u64,
    started: Option<Instant>,
    status: DriverStatus,
}

impl MockAudio {
    pub fn new(cfg: &AudioConfig) -> Self {
        Self {
            sample_rate: cfg.sample_rate.max(1),
            block_size: cfg.block_size,
            n: 0,
            started: None,
            status: DriverStatus::NotInitialized,
        }
    }
}

impl AudioDriver for MockAudio {
    fn initialize(&mut self) -> Result<(), DriverError> {
        info!(
            "MockAudio initialized at {} Hz, block size {}",
            self.sample_rate, self.block_size
        );
        self.status = DriverStatus::Running;
        self.started = Some(Instant::now());
        self.n = 0;
        Ok(())
    }

    fn read_block(&mut self, buf: &mut [i32]) -> Result<usize, DriverError> {
        let started = self.started.ok_or(DriverError::NotInitialized)?;
        let count = buf.len().min(self.block_size);

        // Pace like a DMA engine: wait until the end of this frame
        let frame_end = self.n + count as u64;
        let due = Duration::from_secs_f64(frame_end as f64 / self.sample_rate as f64);
        let elapsed = started.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }

        let mut rng = rand::thread_rng();
        for (i, slot) in buf.iter_mut().take(count).enumerate() {
            let t = (self.n + i as u64) as f32 / self.sample_rate as f32;
            let tone = 3000.0 * (2.0 * PI * 120.0 * t).sin();
            let noise = rng.gen_range(-500.0..500.0);
            *slot = (tone + noise) as i32;
        }
        self.n = frame_end;
        Ok(count)
    }

    fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        self.status = DriverStatus::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecg_requires_initialize() {
        let mut driver = MockEcg::new(1000);
        assert!(driver.read_sample().is_err());
        driver.initialize().unwrap();
        assert!(driver.read_sample().is_ok());
    }

    #[test]
    fn ecg_samples_stay_in_adc_range() {
        let mut driver = MockEcg::new(1000);
        driver.initialize().unwrap();
        for _ in 0..5000 {
            let reading = driver.read_sample().unwrap();
            assert!(reading.raw >= 0 && reading.raw < 4096);
            assert!(!reading.lead_off());
        }
    }

    #[test]
    fn ppg_fifo_fills_over_time() {
        let mut driver = MockPpg::new(1000);
        driver.initialize().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        driver.check().unwrap();
        assert!(driver.available() > 0);
        // FIFO depth is bounded like the real part
        assert!(driver.available() <= PPG_FIFO_DEPTH);
        let pair = driver.next().unwrap();
        assert!(pair.ir > 50_000, "mock IR should read as finger-on");
    }

    #[test]
    fn audio_blocks_are_paced_and_full() {
        let cfg = AudioConfig {
            sample_rate: 16_000,
            block_size: 256,
            average_window: 4,
        };
        let mut driver = MockAudio::new(&cfg);
        driver.initialize().unwrap();
        let mut buf = vec![0i32; 256];
        let start = Instant::now();
        for _ in 0..4 {
            assert_eq!(driver.read_block(&mut buf).unwrap(), 256);
        }
        // 4 blocks of 256 at 16 kHz = 64 ms of audio
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}

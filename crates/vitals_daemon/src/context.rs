//! Per-channel processing contexts
//!
//! Each context is the single owner of its filter chain, denoiser and queue
//! end. The chains are not reentrant, so exclusivity is enforced here by
//! ownership rather than by locking inside the DSP core. Draining is bounded
//! per cycle on the ECG path so a backlog can never monopolize the loop.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use vitals_dsp::{
    AudioChain, BatchDenoiser, DspError, RealTimeDenoiser, SignalChain, Spo2Estimator,
};
use vitals_sensors::RingConsumer;
use vitals_types::{EcgReading, PpgPair};

use crate::config::DaemonConfig;
use crate::sink::PlotSink;

/// ECG samples processed per drain pass, bounding time spent in one cycle.
const ECG_DRAIN_LIMIT: u64 = 50;

pub struct EcgContext {
    chain: SignalChain,
    denoiser: RealTimeDenoiser,
    ring: RingConsumer<EcgReading>,
    lead_off: bool,
    processed: u64,
}

impl EcgContext {
    pub fn new(cfg: &DaemonConfig, ring: RingConsumer<EcgReading>) -> Self {
        Self {
            chain: SignalChain::new(&cfg.filter, cfg.ecg.sample_rate as f32),
            denoiser: RealTimeDenoiser::new(cfg.wavelet.threshold_multiplier),
            ring,
            lead_off: false,
            processed: 0,
        }
    }

    /// Drain up to [`ECG_DRAIN_LIMIT`] samples from the sampler ring.
    ///
    /// Lead-off is a defined degraded state: the lines are still emitted
    /// with a zero placeholder so the stream never silently gaps, and the
    /// chain is reset on reattach so the discontinuity does not ring
    /// through stale delay lines.
    pub fn drain<W: Write>(&mut self, sink: &mut PlotSink<W>) -> io::Result<()> {
        let mut n = 0;
        while n < ECG_DRAIN_LIMIT {
            let Some(reading) = self.ring.pop() else { break };
            n += 1;

            if reading.lead_off() {
                self.lead_off = true;
                sink.emit_decimated_int("ecg_raw", 0)?;
                sink.emit_decimated("ecg_filtered", 0.0)?;
                sink.emit_decimated("ecg_denoised", 0.0)?;
                continue;
            }
            if self.lead_off {
                self.chain.reset();
                self.denoiser.reset();
                self.lead_off = false;
            }

            let filtered = self.chain.process(reading.raw as f32);
            let denoised = self.denoiser.process(filtered);
            sink.emit_decimated_int("ecg_raw", reading.raw as i64)?;
            sink.emit_decimated("ecg_filtered", filtered)?;
            sink.emit_decimated("ecg_denoised", denoised)?;
        }
        self.processed += n;
        Ok(())
    }

    pub fn lead_off(&self) -> bool {
        self.lead_off
    }

    /// Samples declined at the sampler since start.
    pub fn dropped(&self) -> u64 {
        self.ring.dropped()
    }

    /// Samples processed since the last call.
    pub fn take_processed(&mut self) -> u64 {
        std::mem::take(&mut self.processed)
    }

    pub fn reset(&mut self) {
        self.chain.reset();
        self.denoiser.reset();
        self.lead_off = false;
    }
}

pub struct PpgContext {
    chain: SignalChain,
    denoiser: BatchDenoiser,
    estimator: Spo2Estimator,
    rx: flume::Receiver<PpgPair>,
    dropped: Arc<AtomicU64>,
    processed: u64,
}

impl PpgContext {
    /// Fails on an invalid wavelet configuration; the daemon refuses to
    /// start rather than run a misaligned transform.
    pub fn new(
        cfg: &DaemonConfig,
        rx: flume::Receiver<PpgPair>,
        dropped: Arc<AtomicU64>,
    ) -> Result<Self, DspError> {
        Ok(Self {
            chain: SignalChain::new(&cfg.filter, cfg.ppg.sample_rate as f32),
            denoiser: BatchDenoiser::new(&cfg.wavelet)?,
            estimator: Spo2Estimator::new(cfg.spo2.clone(), cfg.ppg.sample_rate),
            rx,
            dropped,
            processed: 0,
        })
    }

    /// Drain every pair the poller has handed over.
    ///
    /// Raw pairs feed the estimator independently of the waveform chain;
    /// the IR waveform additionally runs through filter + batch denoiser.
    pub fn drain<W: Write>(&mut self, sink: &mut PlotSink<W>) -> io::Result<()> {
        while let Ok(pair) = self.rx.try_recv() {
            self.processed += 1;
            self.estimator.add_sample(pair);

            sink.emit_decimated_int("ppg_ir_raw", pair.ir as i64)?;
            sink.emit_decimated_int("ppg_red_raw", pair.red as i64)?;

            let filtered = self.chain.process(pair.ir as f32);
            sink.emit_decimated("ppg_ir_filtered", filtered)?;

            if self.denoiser.push(filtered) {
                while let Some(denoised) = self.denoiser.next_denoised() {
                    sink.emit_decimated("ppg_ir_denoised", denoised)?;
                }
            }
        }
        Ok(())
    }

    pub fn estimator(&self) -> &Spo2Estimator {
        &self.estimator
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn take_processed(&mut self) -> u64 {
        std::mem::take(&mut self.processed)
    }

    pub fn reset(&mut self) {
        self.chain.reset();
        self.denoiser.reset();
        self.estimator.reset();
    }
}

pub struct AudioContext {
    chain: AudioChain,
    rx: flume::Receiver<Vec<i32>>,
    average_window: usize,
    acc: i64,
    acc_len: usize,
    processed: u64,
    dropped: Arc<AtomicU64>,
}

impl AudioContext {
    pub fn new(
        cfg: &DaemonConfig,
        rx: flume::Receiver<Vec<i32>>,
        dropped: Arc<AtomicU64>,
    ) -> Self {
        Self {
            chain: AudioChain::new(&cfg.filter, cfg.audio.effective_rate()),
            rx,
            average_window: cfg.audio.average_window.max(1),
            acc: 0,
            acc_len: 0,
            processed: 0,
            dropped,
        }
    }

    /// Average each group of `average_window` raw samples down to one and
    /// run it through the audio chain.
    pub fn drain<W: Write>(&mut self, sink: &mut PlotSink<W>) -> io::Result<()> {
        while let Ok(block) = self.rx.try_recv() {
            for sample in block {
                self.acc += sample as i64;
                self.acc_len += 1;
                if self.acc_len < self.average_window {
                    continue;
                }
                let averaged = self.acc as f32 / self.acc_len as f32;
                self.acc = 0;
                self.acc_len = 0;
                self.processed += 1;

                let filtered = self.chain.process(averaged);
                sink.emit_decimated("audio_raw", averaged)?;
                sink.emit_decimated("audio_filtered", filtered)?;
            }
        }
        Ok(())
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn take_processed(&mut self) -> u64 {
        std::mem::take(&mut self.processed)
    }

    pub fn reset(&mut self) {
        self.chain.reset();
        self.acc = 0;
        self.acc_len = 0;
    }
}

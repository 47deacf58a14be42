//! Measurement session orchestration
//!
//! One session wires the configured channels to their processing contexts,
//! raises the shared active flag, and drains everything on a short cadence
//! until the duration elapses or a shutdown signal arrives. Stopping clears
//! the flag; the samplers idle and every context is reset before the flag
//! can be raised again, so no prior-session transients leak into new data.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use vitals_sensors::{sample_ring, spawn_audio_reader, spawn_ecg_sampler, spawn_ppg_poller};

use crate::config::DaemonConfig;
use crate::context::{AudioContext, EcgContext, PpgContext};
use crate::drivers;
use crate::sink::PlotSink;

/// Drain cadence of the processing loop.
const PROCESS_INTERVAL: Duration = Duration::from_millis(5);

pub struct Session {
    cfg: DaemonConfig,
    active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    samplers: Vec<JoinHandle<()>>,
    ecg: Option<EcgContext>,
    ppg: Option<PpgContext>,
    audio: Option<AudioContext>,
}

impl Session {
    /// Build drivers and contexts for every enabled channel.
    ///
    /// A channel whose driver fails to initialize is reported and skipped;
    /// the rest of the session runs without it. An invalid DSP configuration
    /// aborts startup instead.
    pub fn new(cfg: DaemonConfig, mock: bool) -> anyhow::Result<Self> {
        let active = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut samplers = Vec::new();

        let ecg = if cfg.channels.ecg {
            match drivers::build_ecg_driver(mock, &cfg.ecg) {
                Ok(driver) => {
                    let (tx, rx) = sample_ring(cfg.ecg.ring_capacity);
                    samplers.push(spawn_ecg_sampler(
                        driver,
                        tx,
                        active.clone(),
                        shutdown.clone(),
                        cfg.ecg.sample_rate,
                    ));
                    Some(EcgContext::new(&cfg, rx))
                }
                Err(e) => {
                    tracing::error!("ECG channel unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let ppg = if cfg.channels.ppg {
            match drivers::build_ppg_driver(mock, &cfg.ppg) {
                Ok(driver) => {
                    let (tx, rx) = flume::bounded(cfg.ppg.queue_capacity);
                    let dropped = Arc::new(AtomicU64::new(0));
                    samplers.push(spawn_ppg_poller(
                        driver,
                        tx,
                        active.clone(),
                        shutdown.clone(),
                        dropped.clone(),
                    ));
                    Some(PpgContext::new(&cfg, rx, dropped)?)
                }
                Err(e) => {
                    tracing::error!("PPG channel unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let audio = if cfg.channels.audio {
            match drivers::build_audio_driver(mock, &cfg.audio) {
                Ok(driver) => {
                    let (tx, rx) = flume::bounded(16);
                    let dropped = Arc::new(AtomicU64::new(0));
                    samplers.push(spawn_audio_reader(
                        driver,
                        tx,
                        active.clone(),
                        shutdown.clone(),
                        cfg.audio.block_size,
                        dropped.clone(),
                    ));
                    Some(AudioContext::new(&cfg, rx, dropped))
                }
                Err(e) => {
                    tracing::error!("audio channel unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            cfg,
            active,
            shutdown,
            samplers,
            ecg,
            ppg,
            audio,
        })
    }

    /// Run one measurement session until `duration` elapses (zero means
    /// until interrupted) or ctrl-c.
    pub async fn run<W: Write>(
        &mut self,
        sink: &mut PlotSink<W>,
        duration: Duration,
    ) -> anyhow::Result<()> {
        // Fresh session: no stale filter/denoiser state may leak in
        self.reset_contexts();
        sink.comment("STARTING...")?;
        self.active.store(true, Ordering::SeqCst);

        let start = Instant::now();
        let stats_interval = Duration::from_millis(self.cfg.output.stats_interval_ms.max(100));
        let mut last_stats = start;

        let mut tick = tokio::time::interval(PROCESS_INTERVAL);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.drain(sink)?;

                    let now = Instant::now();
                    if now.duration_since(last_stats) >= stats_interval {
                        last_stats = now;
                        self.emit_stats(sink, start, stats_interval)?;
                        sink.flush()?;
                    }

                    if !duration.is_zero() && start.elapsed() >= duration {
                        tracing::info!("session duration reached");
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    tracing::info!("shutdown signal received, stopping session");
                    break;
                }
            }
        }

        // Stop producing, then flush whatever already crossed the queues
        self.active.store(false, Ordering::SeqCst);
        self.drain(sink)?;
        sink.comment("DONE.")?;
        sink.flush()?;
        Ok(())
    }

    /// Stop the samplers and wait for their threads.
    pub fn shutdown(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.samplers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("a sampler thread panicked during shutdown");
            }
        }
    }

    fn drain<W: Write>(&mut self, sink: &mut PlotSink<W>) -> std::io::Result<()> {
        if let Some(ecg) = &mut self.ecg {
            ecg.drain(sink)?;
        }
        if let Some(ppg) = &mut self.ppg {
            ppg.drain(sink)?;
        }
        if let Some(audio) = &mut self.audio {
            audio.drain(sink)?;
        }
        Ok(())
    }

    fn emit_stats<W: Write>(
        &mut self,
        sink: &mut PlotSink<W>,
        start: Instant,
        window: Duration,
    ) -> std::io::Result<()> {
        sink.emit_int("runtime_sec", start.elapsed().as_secs() as i64)?;
        let per_sec = 1.0 / window.as_secs_f64();

        if let Some(ecg) = &mut self.ecg {
            let rate = (ecg.take_processed() as f64 * per_sec) as i64;
            sink.emit_int("ecg_rate", rate)?;
            sink.emit_int("ecg_lead_off", ecg.lead_off() as i64)?;
            sink.emit_int("ecg_dropped", ecg.dropped() as i64)?;
        }
        if let Some(ppg) = &mut self.ppg {
            let rate = (ppg.take_processed() as f64 * per_sec) as i64;
            sink.emit_int("ppg_rate", rate)?;
            sink.emit_int("ppg_dropped", ppg.dropped() as i64)?;

            let est = ppg.estimator();
            sink.emit_int("finger", est.finger_present() as i64)?;
            if est.finger_present() {
                sink.emit("heart_rate", est.heart_rate())?;
                sink.emit("spo2", est.spo2())?;
            } else {
                // No finger is a defined degraded state: placeholders, not
                // missing lines
                sink.emit("heart_rate", 0.0)?;
                sink.emit("spo2", 0.0)?;
            }
        }
        if let Some(audio) = &mut self.audio {
            let rate = (audio.take_processed() as f64 * per_sec) as i64;
            sink.emit_int("audio_rate", rate)?;
            sink.emit_int("audio_dropped", audio.dropped() as i64)?;
        }
        Ok(())
    }

    fn reset_contexts(&mut self) {
        if let Some(ecg) = &mut self.ecg {
            ecg.reset();
        }
        if let Some(ppg) = &mut self.ppg {
            ppg.reset();
        }
        if let Some(audio) = &mut self.audio {
            audio.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_session_streams_all_channels() {
        let cfg = DaemonConfig::default();
        let mut session = Session::new(cfg, true).unwrap();
        let mut sink = PlotSink::new(Vec::new(), 1);
        session
            .run(&mut sink, Duration::from_millis(300))
            .await
            .unwrap();
        session.shutdown();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.contains(">ecg_raw:"));
        assert!(out.contains(">ecg_filtered:"));
        assert!(out.contains(">ppg_ir_raw:"));
        assert!(out.contains(">audio_filtered:"));
        assert!(out.contains("# STARTING..."));
        assert!(out.contains("# DONE."));
    }

    #[tokio::test]
    async fn hardware_absent_channels_are_skipped_not_fatal() {
        // Without mock drivers every channel is unavailable; the session
        // must still construct, run and terminate cleanly
        let cfg = DaemonConfig::default();
        let mut session = Session::new(cfg, false).unwrap();
        let mut sink = PlotSink::new(Vec::new(), 1);
        session
            .run(&mut sink, Duration::from_millis(50))
            .await
            .unwrap();
        session.shutdown();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(!out.contains(">ecg_raw:"));
        assert!(out.contains("# DONE."));
    }

    #[tokio::test]
    async fn disabled_channels_spawn_nothing() {
        let mut cfg = DaemonConfig::default();
        cfg.channels.ppg = false;
        cfg.channels.audio = false;
        let mut session = Session::new(cfg, true).unwrap();
        assert_eq!(session.samplers.len(), 1);
        session.shutdown();
    }
}

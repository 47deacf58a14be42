//! Sampler loops bridging drivers to the processing core
//!
//! Each source gets its own thread honoring the §timing contract of its
//! driver: the ECG sampler ticks at a fixed interval and does nothing but
//! read-one-push-one; the PPG poller drains the sensor FIFO as fast as it
//! fills; the audio reader moves whole frames. All handoffs are bounded and
//! drop-counted; no sampler ever blocks on a slow consumer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use vitals_types::{EcgReading, PpgPair};

use crate::ring::RingProducer;
use crate::types::{AudioDriver, EcgDriver, PpgDriver};

/// Idle poll interval while a session is not active.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Spawn the timer-driven ECG sampler.
///
/// The loop body while active is a single driver conversion and a single
/// bounded push, nothing else. Missed deadlines
/// are skipped, not replayed, so a stall cannot cause a burst.
pub fn spawn_ecg_sampler(
    mut driver: Box<dyn EcgDriver>,
    producer: RingProducer<EcgReading>,
    active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    sample_rate: u32,
) -> thread::JoinHandle<()> {
    let period = Duration::from_micros(1_000_000 / sample_rate.max(1) as u64);
    thread::spawn(move || {
        info!("ECG sampler started at {} Hz", sample_rate);
        let mut next_tick = Instant::now() + period;
        let mut read_errors = 0u64;
        while !shutdown.load(Ordering::Relaxed) {
            if active.load(Ordering::Relaxed) {
                match driver.read_sample() {
                    Ok(reading) => {
                        producer.push(reading);
                    }
                    Err(_) => read_errors += 1,
                }
            }

            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
                next_tick += period;
            } else {
                // Behind schedule: realign instead of bursting
                next_tick = now + period;
            }
        }
        if read_errors > 0 {
            warn!("ECG sampler exiting with {} read errors", read_errors);
        }
        let _ = driver.shutdown();
    })
}

/// Spawn the PPG FIFO-draining poller.
///
/// Every pass drains all pairs the sensor has accumulated; a full handoff
/// queue drops the newest pair and counts it rather than stalling the poll.
pub fn spawn_ppg_poller(
    mut driver: Box<dyn PpgDriver>,
    tx: flume::Sender<PpgPair>,
    active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!("PPG poller started");
        while !shutdown.load(Ordering::Relaxed) {
            if !active.load(Ordering::Relaxed) {
                thread::sleep(IDLE_POLL);
                continue;
            }

            if let Err(e) = driver.check() {
                warn!("PPG poll failed: {}", e);
                thread::sleep(IDLE_POLL);
                continue;
            }

            let mut drained = 0;
            while let Some(pair) = driver.next() {
                if tx.try_send(pair).is_err() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                drained += 1;
            }

            if drained == 0 {
                // FIFO was empty; yield briefly instead of spinning
                thread::sleep(Duration::from_millis(1));
            }
        }
        let _ = driver.shutdown();
    })
}

/// Spawn the audio frame reader.
///
/// `read_block` blocks inside the driver until a frame is ready; frames are
/// forwarded whole and dropped whole under backpressure.
pub fn spawn_audio_reader(
    mut driver: Box<dyn AudioDriver>,
    tx: flume::Sender<Vec<i32>>,
    active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    block_size: usize,
    dropped: Arc<AtomicU64>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!("audio reader started, block size {}", block_size);
        let mut block = vec![0i32; block_size];
        while !shutdown.load(Ordering::Relaxed) {
            if !active.load(Ordering::Relaxed) {
                thread::sleep(IDLE_POLL);
                continue;
            }

            match driver.read_block(&mut block) {
                Ok(0) => thread::sleep(Duration::from_millis(1)),
                Ok(n) => {
                    if tx.try_send(block[..n].to_vec()).is_err() {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Err(e) => {
                    warn!("audio read failed: {}", e);
                    thread::sleep(IDLE_POLL);
                }
            }
        }
        let _ = driver.shutdown();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEcg, MockPpg};
    use crate::ring::sample_ring;

    #[test]
    fn ecg_sampler_fills_ring_while_active() {
        let (tx, rx) = sample_ring(2048);
        let active = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut driver = MockEcg::new(1000);
        driver.initialize().unwrap();
        let handle = spawn_ecg_sampler(
            Box::new(driver),
            tx,
            active.clone(),
            shutdown.clone(),
            1000,
        );

        thread::sleep(Duration::from_millis(200));
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        // 200 ms at 1000 Hz: expect on the order of 200 samples, allow slack
        let mut count = 0;
        while rx.pop().is_some() {
            count += 1;
        }
        assert!(count > 50, "only {} samples in 200 ms", count);
    }

    #[test]
    fn ecg_sampler_idles_while_inactive() {
        let (tx, rx) = sample_ring(64);
        let active = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut driver = MockEcg::new(1000);
        driver.initialize().unwrap();
        let handle = spawn_ecg_sampler(
            Box::new(driver),
            tx,
            active.clone(),
            shutdown.clone(),
            1000,
        );

        thread::sleep(Duration::from_millis(50));
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
        assert!(rx.is_empty());
    }

    #[test]
    fn ppg_poller_drains_pairs() {
        let (tx, rx) = flume::bounded(1024);
        let active = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));

        let mut driver = MockPpg::new(1000);
        driver.initialize().unwrap();
        let handle = spawn_ppg_poller(
            Box::new(driver),
            tx,
            active.clone(),
            shutdown.clone(),
            dropped.clone(),
        );

        thread::sleep(Duration::from_millis(100));
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        assert!(rx.len() > 10, "only {} pairs in 100 ms", rx.len());
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
    }
}

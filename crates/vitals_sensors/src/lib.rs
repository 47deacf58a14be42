//! Acquisition adapters for the vitals daemon
//!
//! Driver traits for the three signal sources, a lock-free sampler-to-core
//! ring, the sampler loops that honor the timing contracts, and mock drivers
//! generating synthetic physiology for tests and hardware-free runs.

pub mod acquisition;
pub mod mock;
pub mod ring;
pub mod types;

// Re-export the main types that users need
pub use acquisition::{spawn_audio_reader, spawn_ecg_sampler, spawn_ppg_poller};
pub use ring::{sample_ring, RingConsumer, RingProducer};
pub use types::{AudioDriver, DriverError, DriverStatus, EcgDriver, PpgDriver};

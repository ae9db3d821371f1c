pub mod config;
pub mod logging;
pub mod monitor;
pub mod monitors;
pub mod registry;
pub mod util;

use chrono::{DateTime, Utc};

/// Cumulative host network counters, summed over all interfaces, taken at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkSnapshot {
    pub captured_at: DateTime<Utc>,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

/// Throughput derived from two snapshots. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThroughputRate {
    pub bytes_sent_per_sec: f64,
    pub bytes_recv_per_sec: f64,
    pub packets_sent_per_sec: f64,
    pub packets_recv_per_sec: f64,
}

impl ThroughputRate {
    pub fn sent_kib_per_sec(&self) -> f64 {
        self.bytes_sent_per_sec / 1024.0
    }

    pub fn recv_kib_per_sec(&self) -> f64 {
        self.bytes_recv_per_sec / 1024.0
    }
}

//! Host network counters and throughput rates
//!
//! A [`StatsSource`] snapshots the cumulative counters of all interfaces.
//! [`compute_rate`] turns two snapshots into bytes/packets per second, or
//! explains why no rate could be derived this cycle.

use std::fmt;

use chrono::Utc;
use sysinfo::Networks;
use tracing::trace;

use crate::{NetworkSnapshot, ThroughputRate};

#[derive(Debug)]
pub enum StatsError {
    /// The host reported no network interfaces at all
    NoInterfaces,
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::NoInterfaces => write!(f, "no network interfaces reported by the host"),
        }
    }
}

impl std::error::Error for StatsError {}

/// Capability to read the host's cumulative network counters
pub trait StatsSource: Send {
    fn snapshot(&mut self) -> Result<NetworkSnapshot, StatsError>;
}

/// Reads counters through `sysinfo`, summed over all interfaces.
///
/// `sysinfo` does not expose drop counters; on Linux they are taken from
/// `/proc/net/dev`, elsewhere they stay zero.
pub struct SystemStats {
    networks: Networks,
}

impl SystemStats {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSource for SystemStats {
    fn snapshot(&mut self) -> Result<NetworkSnapshot, StatsError> {
        self.networks.refresh(true);

        if self.networks.list().is_empty() {
            return Err(StatsError::NoInterfaces);
        }

        let mut snapshot = NetworkSnapshot {
            captured_at: Utc::now(),
            ..NetworkSnapshot::default()
        };

        for data in self.networks.list().values() {
            snapshot.bytes_sent += data.total_transmitted();
            snapshot.bytes_recv += data.total_received();
            snapshot.packets_sent += data.total_packets_transmitted();
            snapshot.packets_recv += data.total_packets_received();
            snapshot.errin += data.total_errors_on_received();
            snapshot.errout += data.total_errors_on_transmitted();
        }

        let (dropin, dropout) = read_drop_counters();
        snapshot.dropin = dropin;
        snapshot.dropout = dropout;

        trace!("network snapshot: {snapshot:?}");
        Ok(snapshot)
    }
}

#[cfg(target_os = "linux")]
fn read_drop_counters() -> (u64, u64) {
    match std::fs::read_to_string("/proc/net/dev") {
        Ok(content) => parse_proc_net_dev_drops(&content),
        Err(e) => {
            trace!("could not read /proc/net/dev: {e}");
            (0, 0)
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn read_drop_counters() -> (u64, u64) {
    (0, 0)
}

/// Sum the receive and transmit drop columns of `/proc/net/dev`.
///
/// Each interface line is `name: rx_bytes rx_packets rx_errs rx_drop ... tx_bytes
/// tx_packets tx_errs tx_drop ...`, with eight receive and eight transmit columns.
pub fn parse_proc_net_dev_drops(content: &str) -> (u64, u64) {
    content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(_, counters)| {
            let columns: Vec<u64> = counters
                .split_whitespace()
                .map(|value| value.parse().ok())
                .collect::<Option<_>>()?;
            (columns.len() >= 12).then(|| (columns[3], columns[11]))
        })
        .fold((0, 0), |(rx, tx), (drop_rx, drop_tx)| {
            (rx + drop_rx, tx + drop_tx)
        })
}

/// Why no rate was derived this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No earlier snapshot exists (first cycle, or the last read failed)
    NoPrevious,
    /// The current snapshot could not be taken
    NoCurrent,
    /// The clock did not advance between the two snapshots
    NonPositiveInterval,
    /// A counter went backwards (interface restart, counter wrap)
    CounterReset,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPrevious => write!(f, "no previous snapshot"),
            SkipReason::NoCurrent => write!(f, "no current snapshot"),
            SkipReason::NonPositiveInterval => write!(f, "clock did not advance"),
            SkipReason::CounterReset => write!(f, "network counters were reset"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateOutcome {
    Computed(ThroughputRate),
    Skipped(SkipReason),
}

/// Derive throughput from two snapshots taken `dt_secs` apart.
pub fn compute_rate(
    prev: Option<&NetworkSnapshot>,
    curr: Option<&NetworkSnapshot>,
    dt_secs: f64,
) -> RateOutcome {
    let Some(prev) = prev else {
        return RateOutcome::Skipped(SkipReason::NoPrevious);
    };
    let Some(curr) = curr else {
        return RateOutcome::Skipped(SkipReason::NoCurrent);
    };
    // also rejects NaN
    if !(dt_secs > 0.0) {
        return RateOutcome::Skipped(SkipReason::NonPositiveInterval);
    }

    let deltas = [
        curr.bytes_sent.checked_sub(prev.bytes_sent),
        curr.bytes_recv.checked_sub(prev.bytes_recv),
        curr.packets_sent.checked_sub(prev.packets_sent),
        curr.packets_recv.checked_sub(prev.packets_recv),
    ];
    let [Some(bytes_sent), Some(bytes_recv), Some(packets_sent), Some(packets_recv)] = deltas
    else {
        return RateOutcome::Skipped(SkipReason::CounterReset);
    };

    RateOutcome::Computed(ThroughputRate {
        bytes_sent_per_sec: bytes_sent as f64 / dt_secs,
        bytes_recv_per_sec: bytes_recv as f64 / dt_secs,
        packets_sent_per_sec: packets_sent as f64 / dt_secs,
        packets_recv_per_sec: packets_recv as f64 / dt_secs,
    })
}

/// [`compute_rate`] with the interval taken from the snapshots' capture times.
pub fn rate_between(prev: Option<&NetworkSnapshot>, curr: Option<&NetworkSnapshot>) -> RateOutcome {
    let dt_secs = match (prev, curr) {
        (Some(prev), Some(curr)) => (curr.captured_at - prev.captured_at)
            .num_microseconds()
            .map_or(0.0, |micros| micros as f64 / 1_000_000.0),
        _ => 0.0,
    };
    compute_rate(prev, curr, dt_secs)
}

//! Fakes for the monitor's capabilities and small registry builders

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use latency_guard::{
    NetworkSnapshot,
    logging::LineFormat,
    monitor::Ticker,
    monitors::{
        ProbeError, Prober, Remediator, StatsSource, remediation::RemediationError,
        stats::StatsError,
    },
    registry::{Registry, ServerEntry},
};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt};

/// Prober answering from a fixed address → latency table.
/// Addresses missing from the table are unreachable.
#[derive(Clone, Default)]
pub struct ScriptedProber {
    latencies: Arc<Mutex<HashMap<String, f64>>>,
    calls: Arc<Mutex<Vec<String>>>,
    panic_on: Arc<Mutex<Option<String>>>,
}

impl ScriptedProber {
    pub fn new(latencies: &[(&str, f64)]) -> Self {
        let prober = Self::default();
        for (address, latency) in latencies {
            prober.set(address, *latency);
        }
        prober
    }

    pub fn set(&self, address: &str, latency_ms: f64) {
        self.latencies
            .lock()
            .unwrap()
            .insert(address.to_string(), latency_ms);
    }

    pub fn unreachable(&self, address: &str) {
        self.latencies.lock().unwrap().remove(address);
    }

    /// Panic once when `address` is probed next.
    pub fn panic_once_on(&self, address: &str) {
        *self.panic_on.lock().unwrap() = Some(address.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str) -> Result<f64, ProbeError> {
        self.calls.lock().unwrap().push(address.to_string());

        let should_panic = {
            let mut panic_on = self.panic_on.lock().unwrap();
            if panic_on.as_deref() == Some(address) {
                panic_on.take();
                true
            } else {
                false
            }
        };
        if should_panic {
            panic!("probe of {address} blew up");
        }

        self.latencies
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .ok_or_else(|| ProbeError::Failed {
                code: Some(1),
                output: format!("From {address} icmp_seq=1 Destination Host Unreachable"),
            })
    }
}

/// Counter source replaying queued snapshots; `None` entries and an empty queue fail.
#[derive(Clone, Default)]
pub struct FakeStats {
    queue: Arc<Mutex<VecDeque<Option<NetworkSnapshot>>>>,
}

impl FakeStats {
    pub fn new(snapshots: Vec<Option<NetworkSnapshot>>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(snapshots.into())),
        }
    }
}

impl StatsSource for FakeStats {
    fn snapshot(&mut self) -> Result<NetworkSnapshot, StatsError> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or(StatsError::NoInterfaces)
    }
}

/// Remediator recording the servers it was launched for.
#[derive(Clone, Default)]
pub struct RecordingRemediator {
    launches: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingRemediator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }
}

impl Remediator for RecordingRemediator {
    fn launch(&self, server_name: &str) -> Result<(), RemediationError> {
        if self.fail {
            return Err(RemediationError::Launch {
                command: "Scripts/optimize.sh".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        self.launches.lock().unwrap().push(server_name.to_string());
        Ok(())
    }
}

/// Ticker that allows `remaining` more cycles without sleeping.
#[derive(Clone)]
pub struct CountingTicker {
    remaining: usize,
    ticks: Arc<AtomicUsize>,
}

impl CountingTicker {
    /// Stop after `cycles` cycles in total.
    pub fn cycles(cycles: usize) -> Self {
        Self {
            remaining: cycles.saturating_sub(1),
            ticks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ticker for CountingTicker {
    async fn tick(&mut self) -> bool {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Snapshot `minutes` after [`base_time`] with the given byte counters.
pub fn snapshot_at(minutes: i64, bytes_sent: u64, bytes_recv: u64) -> NetworkSnapshot {
    NetworkSnapshot {
        captured_at: base_time() + Duration::minutes(minutes),
        bytes_sent,
        bytes_recv,
        packets_sent: bytes_sent / 1_000,
        packets_recv: bytes_recv / 1_000,
        ..NetworkSnapshot::default()
    }
}

/// Three enabled servers: Alpha, Bravo, Charlie.
pub fn three_servers() -> Registry {
    Registry::from_iter([
        ("Alpha".to_string(), ServerEntry::new("10.0.0.1")),
        ("Bravo".to_string(), ServerEntry::new("10.0.0.2")),
        ("Charlie".to_string(), ServerEntry::new("10.0.0.3")),
    ])
}

/// Collects formatted log lines while installed as the thread's default subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events into the capture until the guard is dropped.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(self.clone())
                .with_ansi(false)
                .event_format(LineFormat),
        );
        tracing::subscriber::set_default(subscriber)
    }

    /// Captured lines with the timestamp prefix stripped.
    pub fn messages(&self) -> Vec<String> {
        let output = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
        output
            .lines()
            .map(|line| line.split_once(" - ").map_or(line, |(_, rest)| rest).to_string())
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

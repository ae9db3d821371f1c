//! The monitoring loop
//!
//! A [`Monitor`] owns everything one cycle needs: the config, the server registry
//! and the capabilities to probe, read counters, remediate and persist.
//!
//! ```text
//! Starting ──► Cycling ──► Sleeping ──► Cycling ──► ...
//!
//! one cycle:
//!   probe every enabled server ─► maybe remediate ─► record sample
//!   snapshot counters ─► rate vs. previous snapshot ─► log
//!   save registry ─► remember snapshot
//! ```
//!
//! Every step reports its failure as a value and the cycle carries on. A panic
//! inside a cycle is caught at the cycle boundary, logged, and the loop sleeps
//! before the next attempt.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use crate::NetworkSnapshot;
use crate::config::Config;
use crate::monitors::{
    Prober, RateOutcome, RemediationOutcome, Remediator, SkipReason, StatsSource, maybe_optimize,
    stats::rate_between,
};
use crate::registry::{ProbeTarget, Registry, RegistryStore};

/// Decides when the next cycle starts
#[async_trait]
pub trait Ticker: Send {
    /// Wait until the next cycle is due. `false` ends the loop.
    async fn tick(&mut self) -> bool;
}

/// Sleeps a fixed period between cycles.
#[derive(Debug, Clone)]
pub struct IntervalTicker {
    period: Duration,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        tokio::time::sleep(self.period).await;
        true
    }
}

/// What happened during one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Servers that were probed, in probe order
    pub probed: Vec<String>,

    /// Servers whose latency and check time were updated
    pub updated: Vec<String>,

    /// Servers that kept their previous status
    pub failed: Vec<String>,

    /// Remediation actions started this cycle
    pub remediations: usize,

    pub rate: RateOutcome,

    /// Whether the registry was written successfully
    pub persisted: bool,
}

impl Default for CycleReport {
    fn default() -> Self {
        Self {
            probed: Vec::new(),
            updated: Vec::new(),
            failed: Vec::new(),
            remediations: 0,
            rate: RateOutcome::Skipped(SkipReason::NoPrevious),
            persisted: false,
        }
    }
}

pub struct Monitor {
    config: Config,
    registry: Registry,
    store: Box<dyn RegistryStore>,
    prober: Box<dyn Prober>,
    stats: Box<dyn StatsSource>,
    remediator: Box<dyn Remediator>,
    last_stats: Option<NetworkSnapshot>,
}

impl Monitor {
    /// Load the registry (empty when that fails) and take the first counter snapshot.
    pub async fn start(
        config: Config,
        store: Box<dyn RegistryStore>,
        prober: Box<dyn Prober>,
        mut stats: Box<dyn StatsSource>,
        remediator: Box<dyn Remediator>,
    ) -> Self {
        let registry = match store.load().await {
            Ok(registry) => {
                info!(
                    "loaded {} servers ({} monitored) from {}",
                    registry.len(),
                    registry.probe_targets().len(),
                    store.describe()
                );
                registry
            }
            Err(e) => {
                error!(
                    "failed to load server list from {}: {e}, monitoring no servers",
                    store.describe()
                );
                Registry::new()
            }
        };

        let last_stats = take_snapshot(stats.as_mut());

        Self {
            config,
            registry,
            store,
            prober,
            stats,
            remediator,
            last_stats,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn last_snapshot(&self) -> Option<&NetworkSnapshot> {
        self.last_stats.as_ref()
    }

    /// Run cycles until the ticker says stop. Never returns on its own with
    /// [`IntervalTicker`].
    pub async fn run(&mut self, ticker: &mut dyn Ticker) {
        info!(
            "network monitor started (threshold {}ms)",
            self.config.latency_threshold
        );

        loop {
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) => debug!(
                    "cycle finished: {} probed, {} updated, {} failed, {} remediations, persisted: {}",
                    report.probed.len(),
                    report.updated.len(),
                    report.failed.len(),
                    report.remediations,
                    report.persisted
                ),
                Err(panic) => error!("error during monitoring cycle: {}", panic_message(&*panic)),
            }

            if !ticker.tick().await {
                info!("scheduler stopped, leaving monitor loop");
                break;
            }
        }
    }

    /// One full pass: probe, remediate, collect counters, persist.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        for target in self.registry.probe_targets() {
            self.check_server(target, &mut report).await;
        }

        let current = take_snapshot(self.stats.as_mut());
        let rate = rate_between(self.last_stats.as_ref(), current.as_ref());
        log_rate(&rate);
        report.rate = rate;

        report.persisted = self.persist().await;

        self.last_stats = current;
        report
    }

    async fn check_server(&mut self, target: ProbeTarget, report: &mut CycleReport) {
        let ProbeTarget { name, address } = target;
        report.probed.push(name.clone());

        let latency_ms = match self.prober.probe(&address).await {
            Ok(latency_ms) => latency_ms,
            Err(e) => {
                error!("ping to server {name} ({address}) failed: {e}");
                self.warn_stale(&name);
                report.failed.push(name);
                return;
            }
        };

        info!("server {name} current latency: {latency_ms}ms");

        let outcome = maybe_optimize(
            self.remediator.as_ref(),
            &name,
            latency_ms,
            self.config.latency_threshold,
        );
        if outcome == RemediationOutcome::Launched {
            report.remediations += 1;
        }

        match self.registry.record_sample(&name, latency_ms, Utc::now()) {
            Ok(()) => report.updated.push(name),
            Err(e) => {
                error!("could not record latency for server {name}: {e}");
                report.failed.push(name);
            }
        }
    }

    fn warn_stale(&self, name: &str) {
        let Some(last_check) = self.registry.get(name).and_then(|entry| entry.last_check) else {
            return;
        };
        let age = Utc::now() - last_check;
        warn!(
            "server {name} keeps its previous status, last successful check {}s ago",
            age.num_seconds()
        );
    }

    async fn persist(&self) -> bool {
        match self.store.save(&self.registry).await {
            Ok(()) => {
                debug!(
                    "saved {} servers to {}",
                    self.registry.len(),
                    self.store.describe()
                );
                true
            }
            Err(e) => {
                error!(
                    "failed to save server status to {}: {e}",
                    self.store.describe()
                );
                false
            }
        }
    }
}

fn take_snapshot(stats: &mut dyn StatsSource) -> Option<NetworkSnapshot> {
    stats
        .snapshot()
        .inspect_err(|e| error!("failed to read network statistics: {e}"))
        .ok()
}

fn log_rate(rate: &RateOutcome) {
    match rate {
        RateOutcome::Computed(rate) => {
            info!("upload speed: {:.2} KB/s", rate.sent_kib_per_sec());
            info!("download speed: {:.2} KB/s", rate.recv_kib_per_sec());
        }
        RateOutcome::Skipped(reason @ (SkipReason::NoPrevious | SkipReason::NoCurrent)) => {
            debug!("throughput skipped this cycle: {reason}");
        }
        RateOutcome::Skipped(reason) => {
            warn!("throughput skipped this cycle: {reason}");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown error")
}

//! Measurement building blocks used by the monitor loop
//!
//! - **probe**: latency of one server via the OS `ping`
//! - **stats**: host network counters and throughput rates
//! - **remediation**: threshold check and the external optimization script
//!
//! Probing, counter reads and remediation are behind traits (`Prober`,
//! `StatsSource`, `Remediator`) so the loop can run against fakes in tests.

pub mod probe;
pub mod remediation;
pub mod stats;

pub use probe::{PingProber, ProbeError, Prober};
pub use remediation::{RemediationOutcome, Remediator, ScriptRemediator, maybe_optimize};
pub use stats::{RateOutcome, SkipReason, StatsSource, SystemStats, compute_rate};

//! Latency probing via the OS `ping` utility
//!
//! A probe sends a fixed number of echo requests to one address and reports the
//! average round-trip time. There is no retry here; the monitor simply probes
//! again next cycle.

use std::fmt;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{instrument, trace};

/// Slack on top of `count * per-attempt timeout` before the child is killed.
const PROBE_GRACE: Duration = Duration::from_secs(2);

/// Windows: `Minimum = 1ms, Maximum = 3ms, Average = 2ms`
static WINDOWS_AVERAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Average = (\d+(?:\.\d+)?)\s*ms").expect("valid regex")
});

/// Linux/BSD/macOS/BusyBox: `rtt min/avg/max/mdev = 0.045/0.052/0.061/0.007 ms`
static UNIX_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"min/avg/max[^=]*=\s*[\d.]+/([\d.]+)/").expect("valid regex")
});

#[derive(Debug)]
pub enum ProbeError {
    /// The ping utility could not be started
    Spawn(std::io::Error),

    /// The utility did not finish within the overall bound
    TimedOut(Duration),

    /// The utility exited unsuccessfully (unreachable host, unknown name, ...)
    Failed { code: Option<i32>, output: String },

    /// The output carried no recognizable average round-trip marker
    Unparsable { output: String },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Spawn(err) => write!(f, "failed to run ping: {}", err),
            ProbeError::TimedOut(after) => write!(f, "ping timed out after {:?}", after),
            ProbeError::Failed { code, output } => match code {
                Some(code) => write!(f, "ping exited with {}: {}", code, output.trim()),
                None => write!(f, "ping terminated by signal: {}", output.trim()),
            },
            ProbeError::Unparsable { output } => {
                write!(f, "no average round-trip time in ping output: {}", output.trim())
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// Capability to measure the latency of one address
#[async_trait]
pub trait Prober: Send + Sync {
    /// Average round-trip time in milliseconds.
    async fn probe(&self, address: &str) -> Result<f64, ProbeError>;
}

/// Extract the average round-trip time (ms) from ping output.
pub fn parse_average_rtt(output: &str) -> Option<f64> {
    let captures = WINDOWS_AVERAGE
        .captures(output)
        .or_else(|| UNIX_SUMMARY.captures(output))?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;

    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Prober that shells out to the platform's `ping`
#[derive(Debug, Clone)]
pub struct PingProber {
    count: u32,
    timeout: Duration,
}

impl PingProber {
    pub fn new(count: u32, timeout: Duration) -> Self {
        Self {
            count: count.max(1),
            timeout,
        }
    }

    fn args(&self, address: &str) -> Vec<String> {
        let count = self.count.to_string();
        if cfg!(windows) {
            vec![
                "-n".into(),
                count,
                "-w".into(),
                self.timeout.as_millis().to_string(),
                address.into(),
            ]
        } else if cfg!(target_os = "macos") {
            vec![
                "-c".into(),
                count,
                "-W".into(),
                self.timeout.as_millis().to_string(),
                address.into(),
            ]
        } else {
            vec![
                "-c".into(),
                count,
                "-W".into(),
                self.timeout.as_secs().max(1).to_string(),
                address.into(),
            ]
        }
    }

    fn overall_timeout(&self) -> Duration {
        self.timeout
            .saturating_mul(self.count)
            .saturating_add(PROBE_GRACE)
    }
}

#[async_trait]
impl Prober for PingProber {
    #[instrument(skip(self))]
    async fn probe(&self, address: &str) -> Result<f64, ProbeError> {
        let bound = self.overall_timeout();
        trace!("pinging {address} ({} attempts, bound {bound:?})", self.count);

        let child = Command::new("ping")
            .args(self.args(address))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ProbeError::Spawn)?;

        let output = tokio::time::timeout(bound, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::TimedOut(bound))?
            .map_err(ProbeError::Spawn)?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ProbeError::Failed {
                code: output.status.code(),
                output: text,
            });
        }

        parse_average_rtt(&text).ok_or(ProbeError::Unparsable { output: text })
    }
}

//! Registry entries and their on-disk representation
//!
//! ```json
//! {
//!   "Primary": {
//!     "Address": "mc.example.net",
//!     "AutoOptimize": true,
//!     "CurrentLatency": 42.0,
//!     "LastCheck": "2024-05-01T12:00:00.123456Z"
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration and last observed status of one monitored server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerEntry {
    /// Host name or IP address handed to the prober
    pub address: String,

    /// Whether the server takes part in probing and remediation
    #[serde(default = "default_auto_optimize")]
    pub auto_optimize: bool,

    /// Last successful latency sample in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_latency: Option<f64>,

    /// Time of the last successful probe
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "last_check_format"
    )]
    pub last_check: Option<DateTime<Utc>>,

    /// Fields written by other tools, kept as they are
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_auto_optimize() -> bool {
    true
}

impl ServerEntry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            auto_optimize: default_auto_optimize(),
            current_latency: None,
            last_check: None,
            extra: Map::new(),
        }
    }

    pub fn with_auto_optimize(mut self, auto_optimize: bool) -> Self {
        self.auto_optimize = auto_optimize;
        self
    }
}

/// `LastCheck` is written as RFC 3339. Older files carry local timestamps
/// without an offset, which are read as local time.
mod last_check_format {
    use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(at.with_timezone(&Utc)));
        }

        let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| D::Error::custom(format!("invalid LastCheck '{raw}': {e}")))?;

        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|at| Some(at.with_timezone(&Utc)))
            .ok_or_else(|| D::Error::custom(format!("LastCheck '{raw}' does not exist in local time")))
    }
}

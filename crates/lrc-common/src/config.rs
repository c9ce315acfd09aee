//! Coordinator configuration.
//!
//! Plain `serde`-derived configuration, loaded by callers via
//! `serde_json::from_reader` (or any other `serde` format) — the teacher's
//! own common config type has no dependency on the `config` crate, and
//! neither does this one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaParams;

/// Well-known control/data ports (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub dn_recv_cmd_port: u16,
    pub cn_recv_ack_port: u16,
    pub cn_up_data_port: u16,
    pub cn_do_data_port: u16,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            dn_recv_cmd_port: 9000,
            cn_recv_ack_port: 9001,
            cn_up_data_port: 9002,
            cn_do_data_port: 9003,
        }
    }
}

/// Top-level coordinator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub schema: SchemaParams,
    pub ports: PortConfig,
    /// Per-ack deadline; expiry aborts the current stripe without touching
    /// metadata (§5, "Cancellation / timeouts").
    #[serde(with = "humantime_serde_duration")]
    pub ack_timeout: Duration,
    pub log_level: String,
}

impl CoordinatorConfig {
    #[must_use]
    pub fn new(schema: SchemaParams) -> Self {
        Self {
            schema,
            ports: PortConfig::default(),
            ack_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
        }
    }
}

/// Minimal inline `Duration` (de)serializer so this crate does not need to
/// pull in `humantime-serde` for a single field; encodes as whole
/// milliseconds.
mod humantime_serde_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (value.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PlaceMethod;

    #[test]
    fn round_trips_through_json() {
        let schema = SchemaParams::new(4, 2, 1, 0, 4096, 1024, PlaceMethod::OptS).unwrap();
        let config = CoordinatorConfig::new(schema);
        let json = serde_json::to_string(&config).unwrap();
        let back: CoordinatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ack_timeout, config.ack_timeout);
        assert_eq!(back.ports, config.ports);
    }
}

//! `NetworkConfig`: the single entry point for every configuration key
//! the network core recognizes. Unknown top-level sections or keys are
//! ignored with a `tracing::warn!`, matching the rest of the ecosystem's
//! tolerant-config style rather than hard-failing callers on a typo or a
//! newer-than-us config file.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Connection-pool and timeout knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    /// Maximum simultaneous connections to a single host.
    pub max_connections_per_host: u16,
    /// Time budget for establishing a connection.
    pub connect_timeout_ms: u32,
    /// Time budget for a single request/response exchange.
    pub request_timeout_ms: u32,
    /// Upper bound on concurrently open streams per connection; also
    /// sizes the bounded mpsc channel between the connection's reactor
    /// task and its callers.
    pub max_concurrent_streams: u32,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            max_connections_per_host: 6,
            connect_timeout_ms: 30_000,
            request_timeout_ms: 30_000,
            max_concurrent_streams: 100,
        }
    }
}

/// HTTP cache sizing and behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Disk-tier byte budget.
    pub max_bytes: u64,
    /// Entry-count budget, independent of byte size.
    pub max_entries: u64,
    /// Fallback freshness lifetime for responses with no explicit
    /// `Cache-Control`/`Expires`.
    pub default_ttl_sec: u32,
    /// Interval between background eviction sweeps.
    pub cleanup_interval_sec: u32,
    /// Whether bodies are gzip/brotli compressed at rest.
    pub compression_enabled: bool,
    /// Whether bodies are AEAD-sealed at rest.
    pub encryption_enabled: bool,
    /// Whether the disk tier is used at all, versus memory-only.
    pub persistent: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_bytes: 256 * 1024 * 1024,
            max_entries: 10_000,
            default_ttl_sec: 0,
            cleanup_interval_sec: 300,
            compression_enabled: true,
            encryption_enabled: true,
            persistent: true,
        }
    }
}

/// 0-RTT resumption knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroRttSection {
    /// Whether 0-RTT resumption is attempted at all.
    pub enabled: bool,
    /// Maximum early-data bytes a single 0-RTT attempt may send.
    pub max_data_bytes: u32,
    /// Request methods eligible for 0-RTT (idempotent-only by default).
    pub allowed_methods: HashSet<String>,
    /// Replay-guard nonce ring size.
    pub replay_window: u16,
    /// How long an issued ticket remains usable.
    pub ticket_ttl_sec: u32,
    /// Precomputed HEADERS blocks retained per high-priority origin.
    pub precomputed_requests: usize,
}

impl Default for ZeroRttSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_data_bytes: 14_200,
            allowed_methods: ["GET", "HEAD"].into_iter().map(str::to_string).collect(),
            replay_window: 128,
            ticket_ttl_sec: 86_400,
            precomputed_requests: nyx_zero_rtt::DEFAULT_PRECOMPUTED_REQUESTS,
        }
    }
}

/// Connection/security policy gateway knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Enforced domain-policy level.
    pub level: PolicyLevelConfig,
    /// Origins exempted from scanning and header rewrites.
    pub exception_origins: HashSet<String>,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            level: PolicyLevelConfig::Standard,
            exception_origins: HashSet::new(),
        }
    }
}

/// The config-file representation of a [`nyx_policy::DomainPolicyTable`]
/// level; `Custom` carries its rule set inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyLevelConfig {
    /// See [`nyx_policy::DomainPolicyTable::Standard`].
    Standard,
    /// See [`nyx_policy::DomainPolicyTable::High`].
    High,
    /// See [`nyx_policy::DomainPolicyTable::Maximum`].
    Maximum,
    /// See [`nyx_policy::DomainPolicyTable::Custom`].
    Custom(nyx_policy::CustomPolicy),
}

impl From<PolicyLevelConfig> for nyx_policy::DomainPolicyTable {
    fn from(level: PolicyLevelConfig) -> Self {
        match level {
            PolicyLevelConfig::Standard => nyx_policy::DomainPolicyTable::Standard,
            PolicyLevelConfig::High => nyx_policy::DomainPolicyTable::High,
            PolicyLevelConfig::Maximum => nyx_policy::DomainPolicyTable::Maximum,
            PolicyLevelConfig::Custom(custom) => nyx_policy::DomainPolicyTable::Custom(custom),
        }
    }
}

/// The complete, structured configuration surface for the network core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// See [`NetworkSection`].
    pub network: NetworkSection,
    /// See [`CacheSection`].
    pub cache: CacheSection,
    /// See [`ZeroRttSection`].
    pub zero_rtt: ZeroRttSection,
    /// See [`PolicySection`].
    pub policy: PolicySection,
}

const KNOWN_SECTIONS: &[&str] = &["network", "cache", "zero_rtt", "policy"];

impl NetworkConfig {
    /// Parse `json`, warning (but not failing) on unrecognized top-level
    /// sections so a config written for a newer build still loads.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        if let Value::Object(map) = &value {
            for key in map.keys() {
                if !KNOWN_SECTIONS.contains(&key.as_str()) {
                    warn!(section = %key, "ignoring unrecognized network config section");
                }
            }
        }
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = NetworkConfig::default();
        assert_eq!(config.network.max_connections_per_host, 6);
        assert_eq!(config.zero_rtt.max_data_bytes, 14_200);
        assert_eq!(config.zero_rtt.precomputed_requests, 8);
        assert!(config.zero_rtt.allowed_methods.contains("GET"));
        assert!(!config.zero_rtt.allowed_methods.contains("POST"));
    }

    #[test]
    fn unknown_top_level_section_is_ignored_not_rejected() {
        let json = r#"{"network": {"max_connections_per_host": 12}, "future_feature": {"x": 1}}"#;
        let config = NetworkConfig::from_json(json).unwrap();
        assert_eq!(config.network.max_connections_per_host, 12);
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let json = r#"{"cache": {"persistent": false}}"#;
        let config = NetworkConfig::from_json(json).unwrap();
        assert!(!config.cache.persistent);
        assert_eq!(config.cache.max_entries, 10_000);
    }
}

//! Engine configuration
//!
//! Every field has a default, so a host can supply a partial JSON document
//! (or none at all) and override only what it cares about.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sequence parser limits
    pub parser: ParserConfig,
    /// OSC dispatch settings
    pub osc: OscConfig,
    /// RPC channel settings
    pub rpc: RpcConfig,
}

impl EngineConfig {
    /// Parse a JSON document and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.parser.max_params == 0 {
            return Err(Error::Config("parser.max_params must be at least 1".into()));
        }
        if self.parser.max_sequence_len == 0 {
            return Err(Error::Config(
                "parser.max_sequence_len must be at least 1".into(),
            ));
        }
        if self.parser.max_osc_len == 0 {
            return Err(Error::Config("parser.max_osc_len must be at least 1".into()));
        }
        if self.rpc.query_timeout_ms == 0 {
            return Err(Error::Config("rpc.query_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }
}

/// Bounds on in-progress sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Parameters plus sub-parameters allowed in one CSI sequence
    pub max_params: usize,
    /// Bytes allowed between `ESC [` and the final byte
    pub max_sequence_len: usize,
    /// Bytes allowed in an OSC payload
    pub max_osc_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_params: 32,
            max_sequence_len: 256,
            max_osc_len: 65536,
        }
    }
}

/// What to do with OSC kinds nobody registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownOscPolicy {
    /// Keep them in a bounded queue for the host to inspect
    #[default]
    Store,
    /// Drop them
    Ignore,
}

/// OSC dispatcher settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    pub unknown_policy: UnknownOscPolicy,
    /// Capacity of the unknown-command queue; oldest entries are evicted
    pub max_stored: usize,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            unknown_policy: UnknownOscPolicy::Store,
            max_stored: 64,
        }
    }
}

/// RPC channel settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// The single protocol version this engine speaks
    pub protocol_version: u16,
    /// How long an outbound query waits for its reply
    pub query_timeout_ms: u64,
    /// Sweeper tick; 0 disables the background sweeper thread
    pub sweep_interval_ms: u64,
}

impl RpcConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// `None` when the host sweeps timeouts itself
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_ms > 0).then(|| Duration::from_millis(self.sweep_interval_ms))
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            protocol_version: 1,
            query_timeout_ms: 5000,
            sweep_interval_ms: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.parser.max_params, 32);
        assert_eq!(config.rpc.protocol_version, 1);
        assert_eq!(config.rpc.query_timeout(), Duration::from_secs(5));
        assert_eq!(config.osc.unknown_policy, UnknownOscPolicy::Store);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json(r#"{"rpc": {"query_timeout_ms": 250}}"#).unwrap();
        assert_eq!(config.rpc.query_timeout_ms, 250);
        assert_eq!(config.rpc.protocol_version, 1);
        assert_eq!(config.parser, ParserConfig::default());
    }

    #[test]
    fn test_policy_kebab_case() {
        let config =
            EngineConfig::from_json(r#"{"osc": {"unknown_policy": "ignore"}}"#).unwrap();
        assert_eq!(config.osc.unknown_policy, UnknownOscPolicy::Ignore);
    }

    #[test]
    fn test_zero_sweep_disables_sweeper() {
        let rpc = RpcConfig {
            sweep_interval_ms: 0,
            ..RpcConfig::default()
        };
        assert_eq!(rpc.sweep_interval(), None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_json(r#"{"parser": {"max_params": 0}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = EngineConfig::from_json(r#"{"rpc": {"query_timeout_ms": 0}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = EngineConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"parser": {{"max_osc_len": 1024}}}}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.parser.max_osc_len, 1024);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/catty.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

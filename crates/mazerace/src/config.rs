//! Server configuration.

use std::path::Path;
use std::time::Duration;

use mazerace_lobby::HandshakeConfig;
use mazerace_protocol::DEFAULT_PORT;
use mazerace_race::RaceConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Everything the server needs to know before it starts.
///
/// Missing fields fall back to the defaults when deserialized:
///
/// ```
/// use mazerace::ServerConfig;
///
/// let config = ServerConfig::from_json_str(r#"{ "max_sessions": 2 }"#).unwrap();
/// assert_eq!(config.max_sessions, 2);
/// assert_eq!(config.max_queued, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub bind_addr: String,

    /// Capacity of the matchmaking queue.
    pub max_queued: usize,

    /// How many races may run at once. Further pairs wait in the queue.
    pub max_sessions: usize,

    /// How long running races get to finish after shutdown is requested.
    pub shutdown_grace: Duration,

    /// Start with verbose logging switched on.
    pub verbose: bool,

    pub handshake: HandshakeConfig,

    pub race: RaceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            max_queued: 20,
            max_sessions: 10,
            shutdown_grace: Duration::from_secs(5),
            verbose: false,
            handshake: HandshakeConfig::default(),
            race: RaceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.race.rows == 0 || self.race.columns == 0 {
            return Err(ConfigError::Invalid(format!(
                "maze dimensions must be non-zero, got {}x{}",
                self.race.rows, self.race.columns
            )));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid("max_sessions must be at least 1".into()));
        }
        if self.max_queued < 2 {
            return Err(ConfigError::Invalid(
                "max_queued must hold at least one pair".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:9898");
        assert_eq!(config.max_queued, 20);
        assert_eq!(config.max_sessions, 10);
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_str_nested_sections_keep_defaults() {
        let config = ServerConfig::from_json_str(
            r#"{
                "bind_addr": "127.0.0.1:0",
                "race": { "rows": 1, "columns": 2 },
                "handshake": { "timeout": { "secs": 2, "nanos": 0 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:0");
        assert_eq!((config.race.rows, config.race.columns), (1, 2));
        assert_eq!(config.race.ready_timeout, Duration::from_secs(10));
        assert_eq!(config.handshake.timeout, Duration::from_secs(2));
        assert_eq!(config.handshake.protocol_version, 0);
    }

    #[test]
    fn test_from_json_str_zero_rows_is_invalid() {
        let err = ServerConfig::from_json_str(r#"{ "race": { "rows": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_json_str_zero_sessions_is_invalid() {
        let err = ServerConfig::from_json_str(r#"{ "max_sessions": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_json_str_malformed_is_parse_error() {
        let err = ServerConfig::from_json_str("{ max_sessions: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_json_file_missing_is_read_error() {
        let err = ServerConfig::from_json_file("/nonexistent/mazerace.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

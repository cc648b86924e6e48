//! Manager configuration.
//!
//! Loaded from a YAML file; every field has a sensible default except the
//! scripts directory. Durations are written as human-readable strings
//! (`"5s"`, `"250ms"`).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub server: ServerOptions,
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// HTTP server options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOptions {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

/// Script discovery and execution options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Directory scanned for runnable scripts; also the working directory
    /// of every spawned process
    pub directory: String,

    /// Interpreter the scripts are run with
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Extra environment variables for spawned scripts (the manager's own
    /// environment is inherited)
    #[serde(default)]
    pub environment: HashMap<String, String>,

    /// Ring buffer capacity per script
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,

    /// Time allowed for graceful termination before force kill
    #[serde(default = "default_graceful_timeout", with = "duration_serde")]
    pub graceful_timeout: Duration,
}

/// Notification gateway options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            telegram: None,
        }
    }
}

/// Telegram transport credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl ManagerConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: ManagerConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Port must be between 1 and 65535"));
        }

        match self.server.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(anyhow!(
                    "Invalid log level: {}, must be one of: trace, debug, info, warn, error",
                    other
                ))
            }
        }

        if self.scripts.directory.trim().is_empty() {
            return Err(anyhow!("Scripts directory cannot be empty"));
        }

        if self.scripts.interpreter.trim().is_empty() {
            return Err(anyhow!("Interpreter cannot be empty"));
        }

        if self.scripts.max_log_lines == 0 {
            return Err(anyhow!("max_log_lines must be greater than 0"));
        }

        if self.scripts.graceful_timeout.is_zero() {
            return Err(anyhow!("graceful_timeout must be greater than 0"));
        }

        if self.notifications.enabled {
            if let Some(ref telegram) = self.notifications.telegram {
                if telegram.bot_token.trim().is_empty() {
                    return Err(anyhow!("Telegram bot_token cannot be empty"));
                }
                if telegram.chat_id.trim().is_empty() {
                    return Err(anyhow!("Telegram chat_id cannot be empty"));
                }
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_max_log_lines() -> usize {
    1000
}

fn default_graceful_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

// Custom serialization for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, String> {
        // Check for "ms" BEFORE "s" since "ms" ends with 's'
        if s.ends_with("ms") {
            let num_str = &s[..s.len() - 2];
            let millis: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if s.ends_with('s') {
            let num_str = &s[..s.len() - 1];
            let secs: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if s.ends_with('m') {
            let num_str = &s[..s.len() - 1];
            let mins: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(mins * 60))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let config = ManagerConfig::load_from_string("scripts:\n  directory: ./scripts\n").unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.scripts.interpreter, "python3");
        assert_eq!(config.scripts.max_log_lines, 1000);
        assert_eq!(config.scripts.graceful_timeout, Duration::from_secs(5));
        assert!(config.notifications.enabled);
        assert!(config.notifications.telegram.is_none());
    }

    #[test]
    fn test_full_config_round_trip() {
        let yaml = r#"
server:
  port: 9000
  log_level: debug
scripts:
  directory: /srv/scripts
  interpreter: python3
  environment:
    DATA_DIR: /srv/data
  max_log_lines: 500
  graceful_timeout: 250ms
notifications:
  enabled: true
  telegram:
    bot_token: "123:abc"
    chat_id: "42"
"#;
        let config = ManagerConfig::load_from_string(yaml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.scripts.max_log_lines, 500);
        assert_eq!(
            config.scripts.graceful_timeout,
            Duration::from_millis(250)
        );
        assert_eq!(
            config.scripts.environment.get("DATA_DIR"),
            Some(&"/srv/data".to_string())
        );
        let telegram = config.notifications.telegram.unwrap();
        assert_eq!(telegram.bot_token, "123:abc");
        assert_eq!(telegram.chat_id, "42");
    }

    #[test]
    fn test_minute_duration() {
        let yaml = "scripts:\n  directory: ./scripts\n  graceful_timeout: 2m\n";
        let config = ManagerConfig::load_from_string(yaml).unwrap();
        assert_eq!(config.scripts.graceful_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let yaml = "scripts:\n  directory: ./scripts\n  graceful_timeout: soon\n";
        assert!(ManagerConfig::load_from_string(yaml).is_err());
    }

    #[test]
    fn test_empty_directory_rejected() {
        let yaml = "scripts:\n  directory: \"\"\n";
        assert!(ManagerConfig::load_from_string(yaml).is_err());
    }

    #[test]
    fn test_zero_log_lines_rejected() {
        let yaml = "scripts:\n  directory: ./scripts\n  max_log_lines: 0\n";
        assert!(ManagerConfig::load_from_string(yaml).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let yaml = "server:\n  log_level: loud\nscripts:\n  directory: ./scripts\n";
        assert!(ManagerConfig::load_from_string(yaml).is_err());
    }

    #[test]
    fn test_empty_telegram_token_rejected() {
        let yaml = r#"
scripts:
  directory: ./scripts
notifications:
  telegram:
    bot_token: ""
    chat_id: "42"
"#;
        assert!(ManagerConfig::load_from_string(yaml).is_err());
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use ledgerport_pipeline::{Pacing, DEFAULT_MAX_CONCURRENT};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "LEDGERPORT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "ledgerport.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub work_dir: PathBuf,
    pub max_concurrent: usize,
    pub max_upload_bytes: usize,
    pub retention_secs: u64,
    pub cleanup_interval_secs: u64,
    pub step_delay_ms: u64,
    pub finalize_delay_ms: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Daily-rotated `app.log` lands here; empty disables file logging.
    pub log_dir: PathBuf,
    /// Upload page (`index.html`) and its assets.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9090".to_string(),
            work_dir: PathBuf::from("uploads"),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_upload_bytes: 50 * 1024 * 1024,
            retention_secs: 3600,
            cleanup_interval_secs: 600,
            step_delay_ms: 300,
            finalize_delay_ms: 500,
            log_level: "info".to_string(),
            log_format: LogFormat::Plain,
            log_dir: PathBuf::from("logs"),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerConfig {
    /// File named by `LEDGERPORT_CONFIG` (must exist) or `ledgerport.toml`
    /// (optional), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if explicit.is_some() || path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("LEDGERPORT_BIND") {
            self.bind = bind;
        }
        if let Some(dir) = lookup("LEDGERPORT_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LEDGERPORT_LOG_DIR") {
            self.log_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup("LEDGERPORT_MAX_CONCURRENT") {
            self.max_concurrent = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("LEDGERPORT_MAX_CONCURRENT is not a number: '{raw}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("bind address is empty".into()));
        }
        if self.work_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("work_dir is empty".into()));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid("max_concurrent must be at least 1".into()));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid("cleanup_interval_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            per_step: Duration::from_millis(self.step_delay_ms),
            finalize: Duration::from_millis(self.finalize_delay_ms),
        }
    }

    pub fn log_dir(&self) -> Option<&Path> {
        (!self.log_dir.as_os_str().is_empty()).then_some(self.log_dir.as_path())
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.pacing(), Pacing::default());
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = ServerConfig::from_toml_str(
            r#"
bind = "127.0.0.1:8080"
max_concurrent = 2
log_format = "json"
step_delay_ms = 0
"#,
        )
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.pacing().per_step.is_zero());
        assert_eq!(config.work_dir, PathBuf::from("uploads"));
        assert_eq!(config.log_dir(), Some(Path::new("logs")));
        assert_eq!(config.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn empty_log_dir_disables_file_logging() {
        let config = ServerConfig::from_toml_str(r#"log_dir = """#).unwrap();
        assert_eq!(config.log_dir(), None);

        let mut config = ServerConfig::default();
        config
            .apply_env(|k| (k == "LEDGERPORT_LOG_DIR").then(|| "/var/log/lp".to_string()))
            .unwrap();
        assert_eq!(config.log_dir(), Some(Path::new("/var/log/lp")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ServerConfig::from_toml_str("max_conncurrent = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("LEDGERPORT_BIND", "127.0.0.1:1"),
            ("LEDGERPORT_WORK_DIR", "/tmp/lp"),
            ("LEDGERPORT_MAX_CONCURRENT", " 8 "),
        ]
        .into_iter()
        .collect();
        let mut config = ServerConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind, "127.0.0.1:1");
        assert_eq!(config.work_dir, PathBuf::from("/tmp/lp"));
        assert_eq!(config.max_concurrent, 8);
    }

    #[test]
    fn bad_env_number_is_invalid() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(|k| (k == "LEDGERPORT_MAX_CONCURRENT").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_concurrency_fails_validation() {
        let config = ServerConfig {
            max_concurrent: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/ledgerport.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

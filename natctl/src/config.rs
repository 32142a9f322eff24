//! natctl configuration loading and parsing

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogFormat;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/natctl/config.toml";
pub const CONFIG_ENV: &str = "NATCTL_CONFIG";

/// Root configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct NatctlConfig {
    #[serde(default)]
    pub iptables: IptablesConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the config was read from, `None` when defaults are in use
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IptablesConfig {
    #[serde(default = "default_table")]
    pub table: String,
    /// Wait for the xtables lock when the binary supports it
    #[serde(default = "default_true")]
    pub wait: bool,
}

impl Default for IptablesConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            wait: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_ip_forward_path")]
    pub ip_forward_path: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            ip_forward_path: default_ip_forward_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_table() -> String { "nat".into() }
fn default_true() -> bool { true }
fn default_ip_forward_path() -> PathBuf { PathBuf::from("/proc/sys/net/ipv4/ip_forward") }
fn default_log_level() -> String { "info".into() }

/// Load configuration from `$NATCTL_CONFIG` or /etc/natctl/config.toml
pub fn load_config() -> Result<NatctlConfig> {
    let config_path =
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_from(Path::new(&config_path))
}

/// Load configuration from an explicit path. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<NatctlConfig> {
    if !path.exists() {
        return Ok(NatctlConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let mut config: NatctlConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = NatctlConfig::default();
        assert_eq!(config.iptables.table, "nat");
        assert!(config.iptables.wait);
        assert_eq!(
            config.host.ip_forward_path,
            PathBuf::from("/proc/sys/net/ipv4/ip_forward")
        );
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.source.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[iptables]
wait = false

[logging]
format = "json"
"#;
        let config: NatctlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.iptables.table, "nat");
        assert!(!config.iptables.wait);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = load_config_from(Path::new("/nonexistent/natctl.toml")).unwrap();
        assert!(config.source.is_none());
        assert_eq!(config.iptables.table, "nat");
    }

    #[test]
    fn test_load_from_file_records_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[host]\nip_forward_path = \"/tmp/forward\"").unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.source.as_deref(), Some(file.path()));
        assert_eq!(config.host.ip_forward_path, PathBuf::from("/tmp/forward"));
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[iptables\ntable = ").unwrap();

        let err = load_config_from(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }
}

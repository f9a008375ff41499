//! Configuration module for Lingo Gateway
//!
//! Configuration comes from .env files, environment variables and an optional
//! YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use lingo_gateway::config::GatewayConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = GatewayConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = GatewayConfig::from_file(&PathBuf::from("lingo.yaml"))?;
//! println!("Settings stored in {}", config.settings_dir.display());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod yaml;

pub use yaml::YamlConfig;

/// Default request timeout for provider HTTP calls
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 20;

/// Default user agent for the shared HTTP client
pub const DEFAULT_USER_AGENT: &str = concat!("lingo-gateway/", env!("CARGO_PKG_VERSION"));

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Plugin system configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginsConfig {
    /// Register one service per discovered plugin when nothing is persisted yet
    pub default_services: bool,
    /// Plugin IDs that are never instantiated (lowercase)
    pub disabled: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            default_services: true,
            disabled: Vec::new(),
        }
    }
}

impl PluginsConfig {
    pub fn is_disabled(&self, plugin_id: &str) -> bool {
        self.disabled
            .iter()
            .any(|id| id.eq_ignore_ascii_case(plugin_id))
    }
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Root directory for all persisted state
    pub data_dir: PathBuf,
    /// Directory holding one settings blob per key
    pub settings_dir: PathBuf,
    /// Append-only history file (JSON lines)
    pub history_path: PathBuf,
    pub http: HttpConfig,
    pub plugins: PluginsConfig,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(".lingo");
        Self {
            settings_dir: data_dir.join("settings"),
            history_path: data_dir.join("history.jsonl"),
            data_dir,
            http: HttpConfig::default(),
            plugins: PluginsConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `LINGO_DATA_DIR` | `data_dir` (settings/history default beneath it) |
    /// | `LINGO_SETTINGS_DIR` | `settings_dir` |
    /// | `LINGO_HISTORY_PATH` | `history_path` |
    /// | `LINGO_HTTP_TIMEOUT_SECONDS` | `http.timeout_seconds` |
    /// | `LINGO_USER_AGENT` | `http.user_agent` |
    /// | `LINGO_DEFAULT_SERVICES` | `plugins.default_services` |
    /// | `LINGO_DISABLED_PLUGINS` | `plugins.disabled` (comma separated) |
    /// | `LINGO_LOG` | `log_filter` |
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::merge(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the YAML file cannot be read or is malformed,
    /// an environment variable has an invalid format, or validation fails.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = Self::merge(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn merge(yaml: Option<YamlConfig>) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = yaml.unwrap_or_default();
        let storage = yaml.storage.unwrap_or_default();
        let http = yaml.http.unwrap_or_default();
        let plugins = yaml.plugins.unwrap_or_default();
        let logging = yaml.logging.unwrap_or_default();
        let defaults = Self::default();

        let data_dir = storage
            .data_dir
            .or_else(|| env_var("LINGO_DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let settings_dir = storage
            .settings_dir
            .or_else(|| env_var("LINGO_SETTINGS_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("settings"));

        let history_path = storage
            .history_path
            .or_else(|| env_var("LINGO_HISTORY_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("history.jsonl"));

        let timeout_seconds = match http.timeout_seconds {
            Some(v) => v,
            None => match env_var("LINGO_HTTP_TIMEOUT_SECONDS") {
                Some(raw) => raw.parse::<u64>().map_err(|e| {
                    format!("Invalid LINGO_HTTP_TIMEOUT_SECONDS '{raw}': {e}")
                })?,
                None => defaults.http.timeout_seconds,
            },
        };

        let user_agent = http
            .user_agent
            .or_else(|| env_var("LINGO_USER_AGENT"))
            .unwrap_or(defaults.http.user_agent);

        let default_services = match plugins.default_services {
            Some(v) => v,
            None => match env_var("LINGO_DEFAULT_SERVICES") {
                Some(raw) => parse_bool(&raw)
                    .ok_or_else(|| format!("Invalid LINGO_DEFAULT_SERVICES '{raw}'"))?,
                None => defaults.plugins.default_services,
            },
        };

        let disabled = plugins
            .disabled
            .or_else(|| {
                env_var("LINGO_DISABLED_PLUGINS").map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
            })
            .unwrap_or_default()
            .into_iter()
            .map(|id| id.to_lowercase())
            .collect();

        let log_filter = logging
            .filter
            .or_else(|| env_var("LINGO_LOG"))
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            data_dir,
            settings_dir,
            history_path,
            http: HttpConfig {
                timeout_seconds,
                user_agent,
            },
            plugins: PluginsConfig {
                default_services,
                disabled,
            },
            log_filter,
        })
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.http.timeout_seconds == 0 {
            return Err("http.timeout_seconds must be greater than zero".into());
        }
        if self.http.user_agent.trim().is_empty() {
            return Err("http.user_agent must not be empty".into());
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

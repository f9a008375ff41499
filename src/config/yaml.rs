use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables and defaults.
///
/// # Example YAML structure
/// ```yaml
/// storage:
///   data_dir: "/var/lib/lingo"
///   settings_dir: "/var/lib/lingo/settings"
///   history_path: "/var/lib/lingo/history.jsonl"
///
/// http:
///   timeout_seconds: 15
///   user_agent: "lingo-gateway/1.0"
///
/// plugins:
///   default_services: true
///   disabled:
///     - "microsoft-edge-tts"
///
/// logging:
///   filter: "lingo_gateway=debug"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub storage: Option<StorageYaml>,
    pub http: Option<HttpYaml>,
    pub plugins: Option<PluginsYaml>,
    pub logging: Option<LoggingYaml>,
}

/// Storage locations from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub data_dir: Option<String>,
    pub settings_dir: Option<String>,
    pub history_path: Option<String>,
}

/// HTTP transport settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HttpYaml {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

/// Plugin system settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PluginsYaml {
    /// Register one service per discovered plugin when no services are persisted
    pub default_services: Option<bool>,
    /// Plugin IDs that must not be instantiated
    pub disabled: Option<Vec<String>>,
}

/// Logging settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingYaml {
    pub filter: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
storage:
  data_dir: "/tmp/lingo"
  history_path: "/tmp/lingo/history.jsonl"

http:
  timeout_seconds: 5
  user_agent: "custom-agent"

plugins:
  default_services: false
  disabled:
    - "microsoft-edge-tts"

logging:
  filter: "debug"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let storage = config.storage.as_ref().unwrap();
        assert_eq!(storage.data_dir, Some("/tmp/lingo".to_string()));
        assert_eq!(storage.settings_dir, None);
        assert_eq!(config.http.as_ref().unwrap().timeout_seconds, Some(5));
        let plugins = config.plugins.as_ref().unwrap();
        assert_eq!(plugins.default_services, Some(false));
        assert_eq!(
            plugins.disabled.as_deref(),
            Some(&["microsoft-edge-tts".to_string()][..])
        );
        assert_eq!(
            config.logging.as_ref().unwrap().filter,
            Some("debug".to_string())
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let config: YamlConfig = serde_yaml::from_str("http:\n  timeout_seconds: 30\n").unwrap();
        assert!(config.storage.is_none());
        assert_eq!(config.http.unwrap().timeout_seconds, Some(30));
    }

    #[test]
    fn test_yaml_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "storage:\n  data_dir: \"/data\"\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.storage.unwrap().data_dir, Some("/data".to_string()));
    }

    #[test]
    fn test_yaml_from_file_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "http: [unclosed").unwrap();

        assert!(YamlConfig::from_file(&path).is_err());
    }
}

//! Agent configuration

use std::path::{Path, PathBuf};

use postsift_client::ClientConfig;
use postsift_extract::ExtractConfig;
use postsift_telemetry::ReportConfig;
use serde::{Deserialize, Serialize};

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Classifier endpoints and per-attempt deadline
    #[serde(default)]
    pub classifier: ClientConfig,

    /// Mirror list and per-mirror deadline
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Report log location and rotation
    #[serde(default)]
    pub report: ReportConfig,

    /// Failure queue file
    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,

    /// Flagged account store file
    #[serde(default = "default_accounts_path")]
    pub accounts_path: PathBuf,

    /// Labels whose posting account gets flagged in the account store
    #[serde(default = "default_flag_labels")]
    pub flag_labels: Vec<String>,
}

impl AgentConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        Ok(config)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            classifier: ClientConfig::default(),
            extract: ExtractConfig::default(),
            report: ReportConfig::default(),
            queue_path: default_queue_path(),
            accounts_path: default_accounts_path(),
            flag_labels: default_flag_labels(),
        }
    }
}

// The agent is a local sidecar for browser callers, so it binds loopback
// unless configured otherwise.
fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("./failed_posts.jsonl")
}

fn default_accounts_path() -> PathBuf {
    PathBuf::from("./flagged_accounts.jsonl")
}

fn default_flag_labels() -> Vec<String> {
    [
        "Call for Violence",
        "Sectarian Incitement",
        "Spreading False Information",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = AgentConfig::default();
        assert_eq!(config.listen, "127.0.0.1");
        assert_eq!(config.port, 8787);
        assert!(config.classifier.endpoints.is_empty());
        assert_eq!(config.classifier.timeout_ms, 30_000);
        assert_eq!(config.extract.mirrors.len(), 5);
        assert_eq!(config.flag_labels.len(), 3);
    }

    #[test]
    fn partial_yaml_fills_missing_fields_with_defaults() {
        let yaml = r#"
port: 9000
classifier:
  endpoints:
    - url: "https://classify-a.onrender.com/classify"
      name: "render-a"
    - url: "https://classify-b.onrender.com/classify"
"#;
        let config: AgentConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.listen, "127.0.0.1");
        assert_eq!(config.classifier.endpoints.len(), 2);
        assert_eq!(
            config.classifier.endpoints[0].display_name(),
            "render-a"
        );
        assert_eq!(config.classifier.timeout_ms, 30_000);
        assert_eq!(config.report.report_dir, PathBuf::from("./reports"));
    }
}

use crate::core::ConfigProvider;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub services: ServicesConfig,
    pub processing: Option<ProcessingConfig>,
    pub audit: Option<AuditConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub inventory_url: String,
    pub storage_url: String,
    pub audit_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub creation_delay_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub default_origin_country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    pub enabled: Option<bool>,
    pub queue_capacity: Option<usize>,
}

const DEFAULT_ORIGIN_COUNTRY: &str = "Unknown";

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PipelineError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INVENTORY_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PipelineError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn processing(&self) -> ProcessingConfig {
        self.processing.clone().unwrap_or_default()
    }

    pub fn audit_enabled(&self) -> bool {
        self.audit
            .as_ref()
            .and_then(|a| a.enabled)
            .unwrap_or(true)
    }
}

impl ConfigProvider for TomlConfig {
    fn inventory_endpoint(&self) -> &str {
        &self.services.inventory_url
    }

    fn storage_endpoint(&self) -> &str {
        &self.services.storage_url
    }

    fn audit_endpoint(&self) -> Option<&str> {
        if !self.audit_enabled() {
            return None;
        }
        self.services.audit_url.as_deref()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.services.timeout_seconds.unwrap_or(30))
    }

    fn creation_delay(&self) -> Duration {
        Duration::from_millis(self.processing().creation_delay_ms.unwrap_or(50))
    }

    fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.processing().settle_delay_ms.unwrap_or(200))
    }

    fn default_origin_country(&self) -> &str {
        self.processing
            .as_ref()
            .and_then(|p| p.default_origin_country.as_deref())
            .unwrap_or(DEFAULT_ORIGIN_COUNTRY)
    }

    fn audit_queue_capacity(&self) -> usize {
        self.audit
            .as_ref()
            .and_then(|a| a.queue_capacity)
            .unwrap_or(256)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("services.inventory_url", &self.services.inventory_url)?;
        validate_url("services.storage_url", &self.services.storage_url)?;
        if let Some(audit_url) = &self.services.audit_url {
            validate_url("services.audit_url", audit_url)?;
        }
        if let Some(timeout) = self.services.timeout_seconds {
            validate_positive_number("services.timeout_seconds", timeout as usize, 1)?;
        }
        validate_positive_number("audit.queue_capacity", self.audit_queue_capacity(), 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[services]
inventory_url = "https://inventory.example.com/api"
storage_url = "https://storage.example.com/api"
audit_url = "https://audit.example.com"
timeout_seconds = 10

[processing]
creation_delay_ms = 0
settle_delay_ms = 500
default_origin_country = "Bulgaria"

[audit]
queue_capacity = 32
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.inventory_endpoint(), "https://inventory.example.com/api");
        assert_eq!(config.audit_endpoint(), Some("https://audit.example.com"));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.creation_delay(), Duration::ZERO);
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.default_origin_country(), "Bulgaria");
        assert_eq!(config.audit_queue_capacity(), 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_optional_tables_missing() {
        let toml_content = r#"
[services]
inventory_url = "http://localhost:3001"
storage_url = "http://localhost:3002"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.creation_delay(), Duration::from_millis(50));
        assert_eq!(config.settle_delay(), Duration::from_millis(200));
        assert_eq!(config.default_origin_country(), "Unknown");
        assert_eq!(config.audit_endpoint(), None);
    }

    #[test]
    fn test_disabled_audit_hides_endpoint() {
        let toml_content = r#"
[services]
inventory_url = "http://localhost:3001"
storage_url = "http://localhost:3002"
audit_url = "http://localhost:3003"

[audit]
enabled = false
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.audit_endpoint(), None);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PERFUME_TEST_INVENTORY_URL", "https://inventory.internal");

        let toml_content = r#"
[services]
inventory_url = "${PERFUME_TEST_INVENTORY_URL}"
storage_url = "http://localhost:3002"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.services.inventory_url, "https://inventory.internal");

        std::env::remove_var("PERFUME_TEST_INVENTORY_URL");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[services]
inventory_url = "invalid-url"
storage_url = "http://localhost:3002"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[services]
inventory_url = "http://localhost:3001"
storage_url = "http://localhost:3002"

[processing]
default_origin_country = "Morocco"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.default_origin_country(), "Morocco");
    }
}

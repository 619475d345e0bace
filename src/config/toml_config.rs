use crate::core::validator::ValidationRules;
use crate::domain::ports::ServiceConfig;
use crate::utils::error::{Result, TopsisError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_SCORING_PATH: &str = "/api/topsis";
pub const DEFAULT_HEALTH_PATH: &str = "/api/";
pub const DEFAULT_RELAY_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub dataset: DatasetSection,
    #[serde(default)]
    pub validation: ValidationSection,
    pub notification: Option<NotificationSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_scoring_path")]
    pub scoring_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSection {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    /// Reject impact tokens other than `+`/`-` before anything is sent.
    #[serde(default)]
    pub check_impact_symbols: bool,
    #[serde(default = "default_true")]
    pub check_email_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSection {
    #[serde(default = "default_relay_endpoint")]
    pub endpoint: String,
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_scoring_path() -> String {
    DEFAULT_SCORING_PATH.to_string()
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

fn default_relay_endpoint() -> String {
    DEFAULT_RELAY_ENDPOINT.to_string()
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scoring_path: default_scoring_path(),
            health_path: default_health_path(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            check_impact_symbols: false,
            check_email_format: true,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TopsisError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when one is given, otherwise uses built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) if path.as_ref().exists() => Self::from_file(path),
            Some(path) => Err(TopsisError::ConfigError {
                message: format!("config file '{}' not found", path.as_ref().display()),
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TopsisError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EMAILJS_PUBLIC_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TopsisError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("service.base_url", &self.service.base_url)?;
        validation::validate_endpoint_path("service.scoring_path", &self.service.scoring_path)?;
        validation::validate_endpoint_path("service.health_path", &self.service.health_path)?;
        validation::validate_positive_number(
            "service.timeout_seconds",
            self.service.timeout_seconds,
            1,
        )?;
        validation::validate_delimiter("dataset.delimiter", &self.dataset.delimiter)?;

        if let Some(notification) = &self.notification {
            validation::validate_url("notification.endpoint", &notification.endpoint)?;
            validation::validate_non_empty_string(
                "notification.service_id",
                &notification.service_id,
            )?;
            validation::validate_non_empty_string(
                "notification.template_id",
                &notification.template_id,
            )?;
            validation::validate_non_empty_string(
                "notification.public_key",
                &notification.public_key,
            )?;
            for (field, value) in [
                ("notification.service_id", &notification.service_id),
                ("notification.template_id", &notification.template_id),
                ("notification.public_key", &notification.public_key),
            ] {
                if value.starts_with("${") {
                    return Err(TopsisError::MissingConfigError {
                        field: format!("{} (unset variable {})", field, value),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn delimiter(&self) -> Result<u8> {
        validation::validate_delimiter("dataset.delimiter", &self.dataset.delimiter)
    }

    pub fn rules(&self) -> ValidationRules {
        ValidationRules {
            check_impact_symbols: self.validation.check_impact_symbols,
            check_email_format: self.validation.check_email_format,
        }
    }
}

impl ServiceConfig for TomlConfig {
    fn base_url(&self) -> &str {
        &self.service.base_url
    }

    fn scoring_path(&self) -> &str {
        &self.service.scoring_path
    }

    fn health_path(&self) -> &str {
        &self.service.health_path
    }

    fn timeout_seconds(&self) -> u64 {
        self.service.timeout_seconds
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

use crate::normalizer::DEFAULT_BRANDS;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_brands")]
    pub reference_brands: Vec<String>,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    pub identify_url: String,
    #[serde(default = "default_api_key_env")]
    pub identify_api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_identify_timeout")]
    pub identify_timeout_seconds: u64,
    #[serde(default = "default_max_concurrent_images")]
    pub max_concurrent_images: usize,
}

fn default_brands() -> Vec<String> {
    DEFAULT_BRANDS.iter().map(|b| b.to_string()).collect()
}

fn default_database_path() -> String {
    "audit.db".into()
}

fn default_api_key_env() -> String {
    "IDENTIFY_API_KEY".into()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_identify_timeout() -> u64 {
    60
}

fn default_max_concurrent_images() -> usize {
    4
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference_brands.is_empty() {
            return Err(ConfigError::Invalid("reference_brands must not be empty".into()));
        }
        if self.identify_url.trim().is_empty() {
            return Err(ConfigError::Invalid("identify_url must be set".into()));
        }
        if self.max_concurrent_images == 0 {
            return Err(ConfigError::Invalid("max_concurrent_images must be at least 1".into()));
        }
        if self.request_timeout_seconds == 0 || self.identify_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        Ok(())
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn fills_defaults() {
        let file = write_config(r#"{"identify_url": "http://localhost:9000/identify"}"#);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.reference_brands.len(), DEFAULT_BRANDS.len());
        assert_eq!(config.database_path, "audit.db");
        assert_eq!(config.identify_api_key_env, "IDENTIFY_API_KEY");
        assert_eq!(config.request_timeout_seconds, 10);
        assert_eq!(config.identify_timeout_seconds, 60);
        assert_eq!(config.max_concurrent_images, 4);
    }

    #[test]
    fn custom_catalog_replaces_default() {
        let file = write_config(
            r#"{"identify_url": "http://x", "reference_brands": ["Sprite", "Fanta"], "max_concurrent_images": 1}"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.reference_brands, vec!["Sprite", "Fanta"]);
        assert_eq!(config.max_concurrent_images, 1);
    }

    #[test]
    fn rejects_empty_catalog() {
        let file = write_config(r#"{"identify_url": "http://x", "reference_brands": []}"#);
        assert!(matches!(load_config(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let file = write_config(r#"{"identify_url": "http://x", "max_concurrent_images": 0}"#);
        assert!(matches!(load_config(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn reports_parse_and_io_errors() {
        let file = write_config("{not json");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
        assert!(matches!(
            load_config("/definitely/not/here/config.json"),
            Err(ConfigError::Io(_))
        ));
    }
}

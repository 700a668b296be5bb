use crate::core::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Connection settings for the hosted data service. The service key is the
/// privileged credential; it never appears in logs or responses.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
}

/// Settings for the generative model behind the chat assistant.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub addr: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl Config {
    fn config_dir() -> PathBuf {
        #[cfg(windows)]
        {
            dirs::home_dir().expect("Could not find home directory")
        }
        #[cfg(not(windows))]
        {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
        }
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join(".eventdesk").join("config.yaml")
    }

    pub fn load() -> Result<Config, AppError> {
        Self::load_from(Self::config_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Config, AppError> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_yml::from_str::<Config>(&contents)
                .map_err(|e| AppError::Config(format!("Parse {}: {}", path.display(), e)))?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let config = Config::default();
            let _ = config.save_to(&path);
            config
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    /// Environment variables win over file values.
    fn apply_env(&mut self) {
        if let Ok(v) = env::var("EVENTDESK_ADDR") {
            self.addr = Some(v);
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.store.url = Some(v);
        }
        if let Ok(v) = env::var("SUPABASE_SERVICE_KEY") {
            self.store.service_key = Some(v);
        }
        if let Ok(v) = env::var("GEMINI_API_KEY") {
            self.model.api_key = Some(v);
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        let addr = self.addr.as_deref().unwrap_or(DEFAULT_ADDR);
        addr.parse()
            .map_err(|e| AppError::Config(format!("Invalid bind address '{}': {}", addr, e)))
    }

    /// Store settings are mandatory; the server cannot run without them.
    pub fn store_settings(&self) -> Result<(String, String), AppError> {
        let url = self
            .store
            .url
            .clone()
            .ok_or_else(|| AppError::Config("store.url is not set".to_string()))?;
        let key = self
            .store
            .service_key
            .clone()
            .ok_or_else(|| AppError::Config("store.service_key is not set".to_string()))?;
        Ok((url.trim_end_matches('/').to_string(), key))
    }

    pub fn model_base_url(&self) -> String {
        self.model
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string())
    }

    pub fn model_name(&self) -> String {
        self.model
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_defaults_when_unset() {
        let config = Config::default();
        assert_eq!(
            config.bind_addr().unwrap(),
            DEFAULT_ADDR.parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn store_settings_require_url_and_key() {
        let mut config = Config::default();
        assert!(config.store_settings().is_err());

        config.store.url = Some("https://db.example.com/".to_string());
        config.store.service_key = Some("service-key".to_string());
        let (url, key) = config.store_settings().unwrap();
        assert_eq!(url, "https://db.example.com");
        assert_eq!(key, "service-key");
    }

    #[test]
    fn model_defaults_apply() {
        let config = Config::default();
        assert_eq!(config.model_base_url(), DEFAULT_MODEL_BASE_URL);
        assert_eq!(config.model_name(), DEFAULT_MODEL);
    }
}

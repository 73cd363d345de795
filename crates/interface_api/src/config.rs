//! API configuration
//!
//! Read from `API_`-prefixed environment variables, with `__` separating
//! nested sections (for example `API_SERVER__PORT=9000` or
//! `API_PIPELINE__EVALUATION_THRESHOLD=0.8`). Unset values keep their defaults.

use serde::Deserialize;
use std::time::Duration;

use core_kernel::CoreError;
use domain_claims::PipelineSettings;

/// API configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerSettings,
    pub log: LogSettings,
    pub storage: StorageSettings,
    pub wizard: WizardSettings,
    pub upload: UploadSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive such as `info` or `interface_api=debug,info`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Where claims are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: "postgres://localhost/claim_assistant".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WizardSettings {
    /// Simulated processing time of a wizard session
    pub processing_delay_ms: u64,
    /// Idle time after which a session is dropped
    pub session_ttl_secs: u64,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            processing_delay_ms: 2000,
            session_ttl_secs: 3600,
        }
    }
}

impl WizardSettings {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Largest accepted upload request body
    pub max_body_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Checks values that deserialize fine but make no sense
    pub fn validate(&self) -> Result<(), CoreError> {
        self.pipeline.validate()?;
        if self.upload.max_body_bytes == 0 {
            return Err(CoreError::not_positive("upload.max_body_bytes"));
        }
        if self.wizard.session_ttl_secs == 0 {
            return Err(CoreError::not_positive("wizard.session_ttl_secs"));
        }
        Ok(())
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

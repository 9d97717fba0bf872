use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub progress: ProgressConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub bind_addr: String,
    pub port: u16,
    /// Directory with the browser front end. Not served when absent.
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub job_ttl_seconds: u64,
    pub max_jobs: usize,
    pub max_history_entries: usize,
    pub max_artifact_mb: u64,
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "sheet-translator".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: PathBuf::from("./static"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
                .to_string(),
            model: "qwen-mt-turbo".to_string(),
            timeout_seconds: 120,
            max_retries: 3,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./uploads"),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            job_ttl_seconds: 24 * 60 * 60,
            max_jobs: 1000,
            max_history_entries: 500,
            max_artifact_mb: 500,
            cleanup_interval_seconds: 10 * 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            progress: ProgressConfig::default(),
            retention: RetentionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> crate::utils::errors::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::utils::errors::SheetTranslatorError::ConfigError(e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| crate::utils::errors::SheetTranslatorError::ConfigError(e.to_string()))
    }

    /// Loads `path`, falling back to defaults when the file is missing or
    /// invalid. The reason for a fallback is handed back so the caller can log
    /// it once logging is set up.
    pub fn load_or_default(
        path: &str,
    ) -> (Self, Option<crate::utils::errors::SheetTranslatorError>) {
        match Self::load_from_file(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.progress.poll_interval_ms.max(1))
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.retention.job_ttl_seconds)
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{FlowError, Result};

fn default_max_concurrency() -> usize {
    32
}

fn default_max_tokens() -> u32 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub fanout: FanOutConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Filesystem prefix under which media and subtitle files live
    pub static_root: String,
    /// Public URL prefix that replaces `static_root` in responses
    pub public_host: String,
    /// Root directory of the JSON job store
    pub data_dir: PathBuf,
    /// Store implementation
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON documents on disk
    File,
    /// Process memory, lost on restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Speech-to-text upload endpoint
    pub transcription_url: String,
    /// Chat completion endpoint used for translation and summaries
    pub chat_url: String,
    /// Timeout for translation and summary calls
    pub request_timeout_secs: u64,
    /// Timeout for the transcription upload; unset means wait indefinitely
    #[serde(default)]
    pub transcription_timeout_secs: Option<u64>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Used when a profile does not name a speech model
    pub default_whisper_model: String,
    /// Used when a profile does not name a chat model
    pub default_chat_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutConfig {
    /// Ceiling on simultaneously running translation calls, 0 disables the ceiling
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Codec for muxed subtitle streams
    pub subtitle_codec: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                static_root: "/var/www/file_service/".to_string(),
                public_host: "http://localhost:8080/video/service/".to_string(),
                data_dir: PathBuf::from(".vocalflow/data"),
                backend: StoreBackend::File,
            },
            provider: ProviderConfig {
                transcription_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                chat_url: "https://api.openai.com/v1/chat/completions".to_string(),
                request_timeout_secs: 15,
                transcription_timeout_secs: None,
                max_tokens: default_max_tokens(),
                default_whisper_model: "whisper-1".to_string(),
                default_chat_model: "gpt-3.5-turbo".to_string(),
            },
            fanout: FanOutConfig {
                max_concurrency: default_max_concurrency(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                subtitle_codec: "mov_text".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FlowError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| FlowError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FlowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| FlowError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transcription_timeout(&self) -> Option<Duration> {
        self.transcription_timeout_secs.map(Duration::from_secs)
    }
}

impl FanOutConfig {
    pub fn limit(&self) -> Option<usize> {
        (self.max_concurrency > 0).then_some(self.max_concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocalflow.toml");

        let mut config = Config::default();
        config.fanout.max_concurrency = 4;
        config.provider.transcription_timeout_secs = Some(600);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.fanout.limit(), Some(4));
        assert_eq!(loaded.provider.transcription_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(loaded.storage.backend, StoreBackend::File);
    }

    #[test]
    fn test_defaults_keep_transcription_untimed() {
        let config = Config::default();
        assert_eq!(config.provider.request_timeout(), Duration::from_secs(15));
        assert!(config.provider.transcription_timeout().is_none());
    }

    #[test]
    fn test_zero_concurrency_means_unbounded() {
        let fanout = FanOutConfig { max_concurrency: 0 };
        assert_eq!(fanout.limit(), None);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/nonexistent/vocalflow.toml").unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
    }
}

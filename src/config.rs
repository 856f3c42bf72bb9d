//! Configuration for the relay server and chat client.
//!
//! The config lives at `~/.config/finguru/config.toml` (platform
//! equivalent). Every section carries serde defaults so a partial file — or
//! no file at all — resolves to a runnable configuration. API keys are never
//! stored inline by default; they are resolved through a [`SecretRef`].

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay HTTP server settings.
    pub server: ServerConfig,
    /// Upstream generative-language API settings.
    pub upstream: UpstreamConfig,
    /// Chat client settings.
    pub client: ClientConfig,
    /// Durable client-side storage settings.
    pub storage: StorageConfig,
}

/// Relay HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (use port `0` for auto-assign).
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3001,
        }
    }
}

/// Upstream generative-language API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider base URL.
    pub api_url: String,
    /// API key reference.
    pub api_key: SecretRef,
    /// Model for streamed replies.
    pub chat_model: String,
    /// Higher-reasoning model selected when the user enables pro mode.
    pub pro_model: String,
    /// Multimodal model for single-shot chart generation.
    pub chart_model: String,
    /// Maximum tokens to generate per response.
    pub max_output_tokens: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com".to_owned(),
            api_key: SecretRef::Env {
                var: "GEMINI_API_KEY".to_owned(),
            },
            chat_model: "gemini-2.0-flash-exp".to_owned(),
            pro_model: "gemini-2.0-flash-thinking-exp".to_owned(),
            chart_model: "gemini-1.5-pro-latest".to_owned(),
            max_output_tokens: 2048,
        }
    }
}

/// Chat client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the relay server.
    pub backend_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:3001".to_owned(),
        }
    }
}

/// Durable client-side storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database directory override (defaults to the platform data dir).
    pub root_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the storage database path.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        let root = self.root_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("finguru")
        });
        root.join("finguru.db")
    }
}

/// Secret reference used for the upstream API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretRef {
    /// No API key.
    None,
    /// Inline literal key (discouraged; prefer env).
    Literal { value: String },
    /// Resolve the key from an environment variable.
    Env { var: String },
}

impl Default for SecretRef {
    fn default() -> Self {
        Self::None
    }
}

impl SecretRef {
    /// Resolve the secret to a key string.
    ///
    /// # Errors
    ///
    /// Returns a config error when the reference points at a missing or
    /// empty environment variable.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Self::None => Ok(String::new()),
            Self::Literal { value } => Ok(value.clone()),
            Self::Env { var } => {
                let value = std::env::var(var).map_err(|_| {
                    ChatError::Config(format!("API key env var is missing: {var}"))
                })?;
                if value.trim().is_empty() {
                    return Err(ChatError::Config(format!("API key env var is empty: {var}")));
                }
                Ok(value)
            }
        }
    }
}

/// Returns the path of the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("finguru")
        .join("config.toml")
}

impl RelayConfig {
    /// Load the config file, falling back to defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns a config error when the file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from an explicit path (absent file → defaults).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ChatError::Config(format!("failed to read config ({}): {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            ChatError::Config(format!("invalid config ({}): {e}", path.display()))
        })
    }

    /// Write the config to its default location.
    ///
    /// # Errors
    ///
    /// Returns a config error when serialization or the write fails.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    /// Write the config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|e| ChatError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    struct EnvGuard {
        key: &'static str,
        old: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let old = std::env::var_os(key);
            unsafe { std::env::set_var(key, value) };
            Self { key, old }
        }

        fn unset(key: &'static str) -> Self {
            let old = std::env::var_os(key);
            unsafe { std::env::remove_var(key) };
            Self { key, old }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old {
                Some(v) => unsafe { std::env::set_var(self.key, v) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }

    #[test]
    fn defaults_are_runnable() {
        let config = RelayConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.upstream.chat_model, "gemini-2.0-flash-exp");
        assert_eq!(config.upstream.pro_model, "gemini-2.0-flash-thinking-exp");
        assert_eq!(config.upstream.chart_model, "gemini-1.5-pro-latest");
        assert!(config.client.backend_url.starts_with("http://"));
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
[server]
port = 8080
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.upstream.max_output_tokens, 2048);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = RelayConfig::default();
        config.server.port = 4242;
        config.upstream.api_key = SecretRef::Literal {
            value: "sk-inline".to_owned(),
        };
        config.save_to(&path).unwrap();

        let back = RelayConfig::load_from(&path).unwrap();
        assert_eq!(back.server.port, 4242);
        assert_eq!(
            back.upstream.api_key,
            SecretRef::Literal {
                value: "sk-inline".to_owned()
            }
        );
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RelayConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn secret_env_resolves() {
        let _env = EnvGuard::set("FINGURU_TEST_KEY", "secret-123");
        let secret = SecretRef::Env {
            var: "FINGURU_TEST_KEY".to_owned(),
        };
        assert_eq!(secret.resolve().unwrap(), "secret-123");
    }

    #[test]
    fn secret_env_missing_errors() {
        let _env = EnvGuard::unset("FINGURU_TEST_KEY_MISSING");
        let secret = SecretRef::Env {
            var: "FINGURU_TEST_KEY_MISSING".to_owned(),
        };
        assert!(secret.resolve().is_err());
    }

    #[test]
    fn secret_none_resolves_empty() {
        assert_eq!(SecretRef::None.resolve().unwrap(), "");
    }

    #[test]
    fn storage_root_override_is_honored() {
        let storage = StorageConfig {
            root_dir: Some(PathBuf::from("/tmp/finguru-test")),
        };
        assert_eq!(
            storage.db_path(),
            PathBuf::from("/tmp/finguru-test/finguru.db")
        );
    }
}

//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./fgw.toml or ./.fgw/config.toml
//! 2. User config: ~/.fgw/config.toml
//! 3. System config: /etc/fgw/config.toml
//! 4. Built-in defaults
//!
//! Secrets never live in the file: provider API keys are taken from the
//! environment after the file is loaded, and `LLM_ALLOWED_MODELS` can
//! override the allowlist for a single run.

use crate::env;
use crate::gateway::allowlist::ModelAllowlist;
use crate::gateway::types::{ModelId, ModelIdError, ProviderKind};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid model entry '{entry}': {source}")]
    InvalidModel {
        entry: String,
        #[source]
        source: ModelIdError,
    },
    #[error("invalid base URL for provider '{provider}': {source}")]
    InvalidBaseUrl {
        provider: ProviderKind,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Per-vendor connection settings. The key usually comes from the
/// environment; the base URL override exists for proxies and self-hosted
/// compatible endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoint {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderTable {
    pub openai: ProviderEndpoint,
    pub anthropic: ProviderEndpoint,
    pub gemini: ProviderEndpoint,
    pub deepseek: ProviderEndpoint,
}

/// Gateway settings, loaded once at process start and treated as immutable
/// input afterwards.
///
/// `model_priority` order is significant: index 0 is tried first and the
/// router preserves the order exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub model_priority: Vec<String>,
    pub allowed_models: Vec<String>,
    pub attempt_timeout_secs: u64,
    pub providers: ProviderTable,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            model_priority: Vec::new(),
            allowed_models: Vec::new(),
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            providers: ProviderTable::default(),
        }
    }
}

impl GatewaySettings {
    /// Load from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to a TOML file. Intended for `fgw init`-style tooling and tests;
    /// keys present in the struct are written as-is.
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill in secrets and overrides from the environment.
    ///
    /// API keys already present in the file win over the environment so a
    /// config override stays an override. The allowlist is replaced, not
    /// merged, when `LLM_ALLOWED_MODELS` is set.
    pub fn apply_env(&mut self) {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none()
                && let Ok(value) = std_env::var(key)
                && !value.is_empty()
            {
                *slot = Some(value);
            }
        };
        fill(&mut self.providers.openai.api_key, env::keys::OPENAI_API_KEY);
        fill(
            &mut self.providers.anthropic.api_key,
            env::keys::ANTHROPIC_API_KEY,
        );
        fill(&mut self.providers.gemini.api_key, env::keys::GEMINI_API_KEY);
        fill(
            &mut self.providers.deepseek.api_key,
            env::keys::DEEPSEEK_API_KEY,
        );

        if let Ok(value) = std_env::var(env::keys::LLM_ALLOWED_MODELS)
            && !value.trim().is_empty()
        {
            self.allowed_models = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// The ordered candidate list, parsed into model identities.
    pub fn priority(&self) -> Result<Vec<ModelId>, ConfigError> {
        self.model_priority
            .iter()
            .map(|entry| {
                entry
                    .parse::<ModelId>()
                    .map_err(|source| ConfigError::InvalidModel {
                        entry: entry.clone(),
                        source,
                    })
            })
            .collect()
    }

    pub fn allowlist(&self) -> ModelAllowlist {
        ModelAllowlist::new(self.allowed_models.iter().cloned())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy, then apply
    /// environment overrides.
    pub fn discover() -> Result<GatewaySettings, ConfigError> {
        let mut settings = if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            GatewaySettings::from_toml_file(config_path)?
        } else {
            info!("No configuration file found, using defaults");
            GatewaySettings::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }
        debug!("No config file found in discovery hierarchy");
        None
    }

    /// List of configuration file candidates in priority order
    fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::PROJECT_CONFIG_FILE));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/fgw/config.toml"));

        candidates
    }

    fn home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Print the discovery hierarchy and which candidate, if any, exists.
    pub fn show_discovery_info() {
        println!("Configuration discovery order:");
        for candidate in Self::config_candidates() {
            let marker = if candidate.is_file() { "*" } else { " " };
            println!("  {marker} {}", candidate.display());
        }
        println!("(* = present; the first present file wins)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_sane() {
        let settings = GatewaySettings::default();
        assert!(settings.model_priority.is_empty());
        assert_eq!(settings.attempt_timeout_secs, DEFAULT_ATTEMPT_TIMEOUT_SECS);
        assert!(settings.allowlist().is_empty());
    }

    #[test]
    fn parses_full_settings_from_toml() {
        let settings: GatewaySettings = toml::from_str(
            r#"
            model_priority = ["gateway:fast", "openai:gpt-5", "anthropic:claude-sonnet-4-5"]
            allowed_models = ["gateway:fast", "openai:gpt-5"]
            attempt_timeout_secs = 30

            [providers.openai]
            base_url = "https://proxy.internal/v1"

            [providers.anthropic]
            api_key = "file-key"
            "#,
        )
        .unwrap();

        let priority = settings.priority().unwrap();
        assert_eq!(priority.len(), 3);
        assert_eq!(priority[0].qualified_name(), "gateway:fast");
        assert_eq!(priority[2].qualified_name(), "anthropic:claude-sonnet-4-5");
        assert_eq!(settings.attempt_timeout(), Duration::from_secs(30));
        assert_eq!(
            settings.providers.openai.base_url.as_deref(),
            Some("https://proxy.internal/v1")
        );

        let allowlist = settings.allowlist();
        assert_eq!(allowlist.len(), 2);
        assert!(allowlist.contains(&priority[0]));
        assert!(!allowlist.contains(&priority[2]));
    }

    #[test]
    fn priority_rejects_bad_entries() {
        let settings = GatewaySettings {
            model_priority: vec!["openai:gpt-5".to_string(), "not-qualified".to_string()],
            ..Default::default()
        };
        let err = settings.priority().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidModel { entry, .. } if entry == "not-qualified"));
    }

    #[test]
    #[serial]
    fn env_fills_missing_keys_but_never_overrides_file_values() {
        // SAFETY: serialized via #[serial]; no other thread reads these vars.
        unsafe {
            std_env::set_var(env::keys::OPENAI_API_KEY, "env-openai");
            std_env::set_var(env::keys::ANTHROPIC_API_KEY, "env-anthropic");
        }

        let mut settings = GatewaySettings::default();
        settings.providers.anthropic.api_key = Some("file-anthropic".to_string());
        settings.apply_env();

        assert_eq!(
            settings.providers.openai.api_key.as_deref(),
            Some("env-openai")
        );
        assert_eq!(
            settings.providers.anthropic.api_key.as_deref(),
            Some("file-anthropic")
        );

        unsafe {
            std_env::remove_var(env::keys::OPENAI_API_KEY);
            std_env::remove_var(env::keys::ANTHROPIC_API_KEY);
        }
    }

    #[test]
    #[serial]
    fn allowed_models_env_replaces_the_file_list() {
        unsafe {
            std_env::set_var(
                env::keys::LLM_ALLOWED_MODELS,
                "openai:gpt-5, deepseek:deepseek-chat",
            );
        }

        let mut settings = GatewaySettings {
            allowed_models: vec!["anthropic:claude-sonnet-4-5".to_string()],
            ..Default::default()
        };
        settings.apply_env();

        assert_eq!(
            settings.allowed_models,
            vec!["openai:gpt-5".to_string(), "deepseek:deepseek-chat".to_string()]
        );

        unsafe {
            std_env::remove_var(env::keys::LLM_ALLOWED_MODELS);
        }
    }
}

//! Environment constants and path utilities for the gateway.
//!
//! Centralizes the file names, directory names, and environment variable
//! names used throughout the application.

use std::path::{Path, PathBuf};

/// Main application directory name (hidden directory like .git, .vscode)
pub const APP_DIR_NAME: &str = ".fgw";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Project-local configuration file name
pub const PROJECT_CONFIG_FILE: &str = "fgw.toml";

/// Environment variable names read by the settings loader
pub mod keys {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";

    /// Comma-separated list of qualified model names overriding the
    /// configured allowlist
    pub const LLM_ALLOWED_MODELS: &str = "LLM_ALLOWED_MODELS";
}

/// Path to the local config file inside a project directory
pub fn local_config_file_path(dir: &Path) -> PathBuf {
    dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Path to the user config directory inside a home directory
pub fn user_config_dir_path(home: &Path) -> PathBuf {
    home.join(APP_DIR_NAME)
}

/// Path to the user config file inside a home directory
pub fn user_config_file_path(home: &Path) -> PathBuf {
    user_config_dir_path(home).join(CONFIG_FILE_NAME)
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "ContextBundler";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "contextbundler", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file, inside `dir_override` if given.
pub fn get_config_file_path(dir_override: Option<&Path>) -> Option<PathBuf> {
    match dir_override {
        Some(dir) => Some(dir.join(CONFIG_FILE)),
        None => get_config_directory().map(|dir| dir.join(CONFIG_FILE)),
    }
}

/// Loads the application configuration from the config file.
///
/// If the file doesn't exist, a default one is written. If it cannot be
/// parsed, a warning is logged and the defaults are used instead.
pub fn load_config(dir_override: Option<&Path>) -> Result<AppConfig> {
    let config_path = get_config_file_path(dir_override)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, dir_override)?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file {:?}", config_path))?;

    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(AppConfig::default())
        }
    }
}

/// Saves the provided configuration to the config file.
pub fn save_config(config: &AppConfig, dir_override: Option<&Path>) -> Result<()> {
    let config_dir = match dir_override {
        Some(dir) => dir.to_path_buf(),
        None => get_config_directory()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;
        tracing::info!("Created config directory: {:?}", config_dir);
    }

    let config_path = config_dir.join(CONFIG_FILE);
    let config_json = serde_json::to_string_pretty(config)?;

    fs::write(&config_path, config_json)
        .with_context(|| format!("Failed to write config file {:?}", config_path))?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.contextbundler.ContextBundler/
// Linux:   ~/.config/contextbundler/
// Windows: %APPDATA%/contextbundler/ContextBundler/config/

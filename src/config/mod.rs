pub mod schema;

pub use schema::{AgentConfig, AgentSettings, LlmConfig, Provider, ToolsConfig};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Config file name inside the home directory.
pub const CONFIG_FILE: &str = "smol-agent.toml";

/// Default home directory (~/.smol-agent).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".smol-agent"))
        .unwrap_or_else(|| PathBuf::from(".smol-agent"))
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    default_home_dir().join(CONFIG_FILE)
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let config = if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read smol-agent config file")?;
        toml::from_str::<AgentConfig>(&contents)
            .context("Failed to parse smol-agent config (TOML)")?
    } else {
        AgentConfig::default()
    };
    Ok(config.normalized())
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &AgentConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

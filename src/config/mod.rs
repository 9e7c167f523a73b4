mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./transforge.toml",
        "~/.config/transforge/config.toml",
        "/etc/transforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if let Some(path) = &config.tools.ffmpeg_path {
        if !path.exists() {
            anyhow::bail!("Configured ffmpeg path does not exist: {:?}", path);
        }
    }

    if config.events.capacity == 0 {
        anyhow::bail!("Event channel capacity cannot be 0");
    }

    if let Some(crf) = config.conversion.defaults.crf {
        if crf > 51 {
            anyhow::bail!("Default CRF {} is out of range (0-51)", crf);
        }
    }

    Ok(())
}

//! `mender config` — Configuration management commands.

use mender_config::AppConfig;
use mender_core::{Error, Result};

pub fn show() -> Result<()> {
    let config = AppConfig::load()?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| Error::Internal(format!("Failed to render config: {e}")))?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() -> Result<()> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub fn init(force: bool) -> Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !force {
        println!("⚠️  Config already exists at {}", config_path.display());
        println!("   Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote default config to {}", config_path.display());
    Ok(())
}

//! `ambit init` — write the default configuration file.

use ambit_config::AppConfig;
use std::path::{Path, PathBuf};

pub fn run(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.unwrap_or_else(AppConfig::config_path);
    if write_default(&path, force)? {
        println!("✅ Created config.toml at: {}", path.display());
        println!("\n   Set api_key there or export AMBIT_API_KEY, then run `ambit run`.");
    } else {
        println!("  Config already exists: {}", path.display());
        println!("  Use --force to overwrite it.");
    }
    Ok(())
}

/// Write the defaults to `path`. Returns `false` when the file exists and
/// `force` is not set.
fn write_default(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}

use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, SockFilterError};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| SockFilterError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| SockFilterError::Config(format!("Failed to parse config: {e}")))?;

    validate(&cfg)?;

    Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.program.path.as_os_str().is_empty() {
        return Err(SockFilterError::Config("program path cannot be empty".to_string()));
    }

    if let Some(name) = &cfg.program.name {
        if name.trim().is_empty() {
            return Err(SockFilterError::Config("program name cannot be empty".to_string()));
        }
    }

    let level = cfg.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(SockFilterError::Config(format!(
            "Unknown log level '{}', expected one of: {}",
            cfg.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}

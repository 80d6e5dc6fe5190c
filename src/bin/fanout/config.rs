//! On-disk settings, `~/.config/fanout/config.toml` on Linux.
//!
//! Every field is optional; a missing file means defaults.

use std::path::PathBuf;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use serde::{Deserialize, Serialize};

use fanout_dsp::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sample rate is taken from the output device
    pub engine: EngineConfig,
    /// Port the patch router listens on
    pub port: u16,
    pub patch: PatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            port: 9000,
            patch: PatchConfig::default(),
        }
    }
}

/// Starting values of the demo patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub carrier: f64,
    pub ratio: f64,
    pub index: f64,
    pub level: f64,
    pub cutoff: f64,
    pub q: f64,
    pub pan: f64,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            carrier: 220.0,
            ratio: 0.5,
            index: 4.0,
            level: 0.2,
            cutoff: 1_200.0,
            q: 2.0,
            pan: 0.5,
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fanout")
        .join("config.toml")
}

pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fanout")
}

pub fn load() -> EyreResult<AppConfig> {
    let path = config_path();
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(err) => return Err(err).wrap_err_with(|| format!("failed to read {}", path.display())),
    };
    let config: AppConfig = toml::from_str(&text).wrap_err_with(|| format!("invalid config in {}", path.display()))?;
    config.engine.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fill_defaults() {
        let config: AppConfig = toml::from_str("port = 7000\n[patch]\ncutoff = 500.0\n").unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.patch.cutoff, 500.0);
        assert_eq!(config.patch.carrier, 220.0);
        assert_eq!(config.engine, EngineConfig::default());
    }
}

// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load, validate, and resolve relative paths against the config file's
/// directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config.resolve_paths(&config_root_dir(path)))
}

/// Defaults for every section, with paths relative to the working directory.
pub fn default_config() -> Result<ConfigFile> {
    ConfigFile::try_from(RawConfigFile::default())
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("Geoflow.toml")
}

/// Directory relative paths in a config file are resolved against.
///
/// A bare file name like `Geoflow.toml` has an empty parent, which means the
/// current directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

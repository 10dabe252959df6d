//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names searched for an application called `app`
pub fn config_file_names(app: &str) -> [String; 2] {
    [format!("{}.yml", app), format!("{}.yaml", app)]
}

/// Find the configuration file by searching current and parent directories,
/// then the user's config directory
pub fn find_config_file(app: &str) -> ConfigResult<PathBuf> {
    let current_dir = env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?;

    match find_config_file_from(current_dir, app) {
        Ok(path) => Ok(path),
        Err(ConfigError::NotFound(searched)) => match user_config_file(app) {
            Some(path) => Ok(path),
            None => Err(ConfigError::NotFound(searched)),
        },
        Err(e) => Err(e),
    }
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf, app: &str) -> ConfigResult<PathBuf> {
    let file_names = config_file_names(app);
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in &file_names {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        // Try parent directory
        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Config file in the platform's per-user config directory, if present
pub fn user_config_file(app: &str) -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", app)?;
    config_file_names(app)
        .iter()
        .map(|name| dirs.config_dir().join(name))
        .find(|path| path.is_file())
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> ConfigResult<Config> {
    let contents = fs::read_to_string(path).map_err(|error| ConfigError::Read {
        path: path.to_path_buf(),
        error,
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> ConfigResult<Config> {
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Discover and parse the configuration file for `app`, if there is one
pub fn parse_config_auto(app: &str) -> ConfigResult<Option<(Config, PathBuf)>> {
    match find_config_file(app) {
        Ok(path) => {
            let config = parse_config_file(&path)?;
            Ok(Some((config, path)))
        }
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

//! Worker configuration
//!
//! # Configuration Sources (lowest priority first)
//!
//! 1. Built-in defaults
//! 2. Config file: `lumen-worker.toml`, or the path in `LUMEN_WORKER_CONFIG`
//! 3. Environment variables: `LUMEN_DEBUG`, `LUMEN_LOG_LEVEL`, `LUMEN_NUM_THREADS`
//! 4. Command line: the `--osp:*` flags
//!
//! # Example Config File
//!
//! ```toml
//! debug = false
//! log_level = 1
//! num_threads = 8
//! tile_size = 64
//! ```

use std::path::{Path, PathBuf};

use lumen_engine::{EngineConfig, TILE_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::Diagnostics;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "lumen-worker.toml";
/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "LUMEN_WORKER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A flag that takes a value was last on the command line
    #[error("Missing value after {0}")]
    MissingValue(String),

    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

/// Complete worker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Debug mode: single render thread, trace logging
    pub debug: bool,
    /// 0 quiet, 1 verbose, 2 very verbose
    pub log_level: u32,
    /// Render threads; `None` uses every core
    pub num_threads: Option<usize>,
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// File the configuration was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: 0,
            num_threads: None,
            tile_size: TILE_SIZE,
            config_path: None,
        }
    }
}

impl WorkerConfig {
    /// Load from every source; returns the arguments the CLI parser left alone
    pub fn load(args: Vec<String>) -> Result<(Self, Vec<String>), ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::load_from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        let rest = config.apply_args(args)?;
        Ok((config, rest))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Override from environment variables, read through `var`
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = var("LUMEN_DEBUG") {
            self.debug = parse_bool("LUMEN_DEBUG", &value)?;
        }
        if let Some(value) = var("LUMEN_LOG_LEVEL") {
            self.log_level = parse_number("LUMEN_LOG_LEVEL", &value)?;
        }
        if let Some(value) = var("LUMEN_NUM_THREADS") {
            self.num_threads = Some(parse_number("LUMEN_NUM_THREADS", &value)?);
        }
        Ok(())
    }

    /// Consume the `--osp:*` flags, returning every other argument in order
    pub fn apply_args<I>(&mut self, args: I) -> Result<Vec<String>, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut rest = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--osp:debug" => {
                    self.debug = true;
                    self.num_threads = Some(1);
                }
                "--osp:verbose" => self.log_level = 1,
                "--osp:vv" => self.log_level = 2,
                "--osp:loglevel" => {
                    let value = args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    self.log_level = parse_number(&arg, &value)?;
                }
                "--osp:numthreads" | "--osp:num-threads" => {
                    let value = args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    self.num_threads = Some(parse_number(&arg, &value)?);
                }
                _ => rest.push(arg),
            }
        }
        Ok(rest)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.debug, self.log_level)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            num_threads: self.num_threads,
            tile_size: self.tile_size,
            debug: self.debug,
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cli_flags_are_consumed() {
        let mut config = WorkerConfig::default();
        let rest = config
            .apply_args(args(&["lumen-worker", "--osp:vv", "scene.obj", "--osp:numthreads", "4", "--fast"]))
            .unwrap();
        assert_eq!(rest, args(&["lumen-worker", "scene.obj", "--fast"]));
        assert_eq!(config.log_level, 2);
        assert_eq!(config.num_threads, Some(4));
    }

    #[test]
    fn test_debug_forces_single_thread() {
        let mut config = WorkerConfig::default();
        config
            .apply_args(args(&["--osp:num-threads", "16", "--osp:debug", "--osp:loglevel", "1"]))
            .unwrap();
        assert!(config.debug);
        assert_eq!(config.num_threads, Some(1));
        assert_eq!(config.log_level, 1);
        assert_eq!(config.engine_config().num_threads, Some(1));
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let mut config = WorkerConfig::default();
        assert!(matches!(
            config.apply_args(args(&["--osp:loglevel"])),
            Err(ConfigError::MissingValue(flag)) if flag == "--osp:loglevel"
        ));
        assert!(matches!(
            config.apply_args(args(&["--osp:numthreads", "many"])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "log_level = 1\nnum_threads = 2\ntile_size = 32\n").unwrap();

        let mut config = WorkerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.tile_size, 32);
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));

        let env: HashMap<&str, &str> = [("LUMEN_NUM_THREADS", "6"), ("LUMEN_DEBUG", "true")].into();
        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.num_threads, Some(6));
        assert_eq!(config.log_level, 1);
        assert!(config.debug);
        assert_eq!(config.diagnostics().level_filter(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "tile_size = \"big\"").unwrap();
        assert!(matches!(WorkerConfig::load_from_file(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(
            WorkerConfig::load_from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}

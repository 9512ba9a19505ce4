//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `UP_*`
//! environment variables, and merging them with proper precedence rules.

use crate::error::ProbeError;
use crate::types::{OutputFormat, MAX_WORKERS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for engine and input options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Result file preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Number of worker loops
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Concurrency cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Request timeout (e.g. "3000ms", "3s", "1m"; bare numbers are milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// URL list path, `-` for stdin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Redirect hint heuristic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_hint: Option<bool>,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Result file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// "csv" or "json"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Write a header line to CSV output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<bool>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were found
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ProbeError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ProbeError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ProbeError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ProbeError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Files are merged lowest to highest: XDG, home directory, current
    /// directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, ProbeError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        if self.verbose {
            for (i, path) in loaded_files.iter().enumerate() {
                let status = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden where set again"
                };
                debug!(path = %path.display(), status, "loaded config file");
            }
        }

        Ok(merged_config)
    }

    /// Config file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./url-probe.toml", "./.url-probe.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Config file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".url-probe.toml", "url-probe.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Config file following the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("url-probe").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    workers: higher.workers.or(lower.workers),
                    concurrency: higher.concurrency.or(lower.concurrency),
                    timeout: higher.timeout.or(lower.timeout),
                    input: higher.input.or(lower.input),
                    redirect_hint: higher.redirect_hint.or(lower.redirect_hint),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(lower), Some(higher)) => Some(OutputConfig {
                    path: higher.path.or(lower.path),
                    format: higher.format.or(lower.format),
                    header: higher.header.or(lower.header),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ProbeError> {
        if let Some(defaults) = &config.defaults {
            if let Some(workers) = defaults.workers {
                validate_pool_size("workers", workers)?;
            }
            if let Some(concurrency) = defaults.concurrency {
                validate_pool_size("concurrency", concurrency)?;
            }
            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(ProbeError::config(format!(
                        "Invalid timeout format '{}'. Use format like '3000ms', '3s', '1m'",
                        timeout_str
                    )));
                }
            }
            if let Some(input) = &defaults.input {
                if input.trim().is_empty() {
                    return Err(ProbeError::config("Input path cannot be empty"));
                }
            }
        }

        if let Some(output) = &config.output {
            if let Some(format) = &output.format {
                format.parse::<OutputFormat>()?;
            }
            if let Some(path) = &output.path {
                if path.trim().is_empty() {
                    return Err(ProbeError::config("Output path cannot be empty"));
                }
            }
        }

        Ok(())
    }
}

fn validate_pool_size(name: &str, value: usize) -> Result<(), ProbeError> {
    if value == 0 || value > MAX_WORKERS {
        return Err(ProbeError::config(format!(
            "{} must be between 1 and {}",
            name, MAX_WORKERS
        )));
    }
    Ok(())
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via UP_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub workers: Option<usize>,
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub file: Option<String>,
    pub output: Option<String>,
    pub format: Option<OutputFormat>,
    pub header: Option<bool>,
    pub redirect_hint: Option<bool>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`] with an injectable variable lookup.
pub fn load_env_config_from<L>(lookup: L) -> EnvConfig
where
    L: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // UP_WORKERS / UP_CONCURRENCY - pool sizes
    env_config.workers = lookup("UP_WORKERS").and_then(|val| parse_pool_var("UP_WORKERS", &val));
    env_config.concurrency =
        lookup("UP_CONCURRENCY").and_then(|val| parse_pool_var("UP_CONCURRENCY", &val));

    // UP_TIMEOUT - request deadline
    if let Some(val) = lookup("UP_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => {
                debug!(value = %val, "using UP_TIMEOUT");
                env_config.timeout = Some(timeout);
            }
            None => warn!(value = %val, "invalid UP_TIMEOUT, use format like '3000ms', '3s'"),
        }
    }

    // UP_FILE / UP_OUTPUT / UP_CONFIG - paths
    env_config.file = lookup("UP_FILE").and_then(|val| non_empty_var("UP_FILE", val));
    env_config.output = lookup("UP_OUTPUT").and_then(|val| non_empty_var("UP_OUTPUT", val));
    env_config.config = lookup("UP_CONFIG").and_then(|val| non_empty_var("UP_CONFIG", val));

    // UP_FORMAT - csv or json
    if let Some(val) = lookup("UP_FORMAT") {
        match val.parse::<OutputFormat>() {
            Ok(format) => {
                debug!(value = %val, "using UP_FORMAT");
                env_config.format = Some(format);
            }
            Err(e) => warn!(value = %val, error = %e, "invalid UP_FORMAT"),
        }
    }

    // UP_HEADER / UP_REDIRECT_HINT - booleans
    env_config.header = lookup("UP_HEADER").and_then(|val| parse_bool_var("UP_HEADER", &val));
    env_config.redirect_hint =
        lookup("UP_REDIRECT_HINT").and_then(|val| parse_bool_var("UP_REDIRECT_HINT", &val));

    env_config
}

fn parse_pool_var(name: &str, val: &str) -> Option<usize> {
    match val.trim().parse::<usize>() {
        Ok(n) if n > 0 && n <= MAX_WORKERS => {
            debug!(name, value = n, "using environment override");
            Some(n)
        }
        _ => {
            warn!(name, value = %val, "invalid value, must be 1-{}", MAX_WORKERS);
            None
        }
    }
}

fn parse_bool_var(name: &str, val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!(name, value = %val, "invalid boolean, use true/false");
            None
        }
    }
}

fn non_empty_var(name: &str, val: String) -> Option<String> {
    if val.trim().is_empty() {
        None
    } else {
        debug!(name, value = %val, "using environment override");
        Some(val)
    }
}

/// Parse a timeout string like "3000ms", "3s" or "2m".
///
/// A bare number is read as milliseconds. Zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let duration = if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        timeout_str.parse::<u64>().ok().map(Duration::from_millis)
    }?;

    (!duration.is_zero()).then_some(duration)
}

//! Configuration loading from disk and the command line.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::SupervisorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            ConfigError::Parse(e) => write!(f, "parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "invalid configuration: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Values given on the command line. They win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub link: Option<PathBuf>,
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
    pub sync_timeout_ms: Option<u64>,
    pub interval_ms: Option<u64>,
    pub probe_command: Option<String>,
    pub probe_timeout_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    /// Appended to the file's recipients.
    pub recipients: Vec<String>,
    pub verbose: bool,
    pub pretend: bool,
    pub daemonize: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut SupervisorConfig) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        set(&mut config.paths.link, &self.link);
        set(&mut config.paths.primary, &self.primary);
        set(&mut config.paths.secondary, &self.secondary);
        set(&mut config.sync.timeout_ms, &self.sync_timeout_ms);
        set(&mut config.sync.interval_ms, &self.interval_ms);
        set(&mut config.probe.timeout_ms, &self.probe_timeout_ms);

        if self.probe_command.is_some() {
            config.probe.command = self.probe_command.clone();
        }
        if self.log_file.is_some() {
            config.observability.log_file = self.log_file.clone();
        }
        if self.output_file.is_some() {
            config.observability.command_output = self.output_file.clone();
        }
        for recipient in &self.recipients {
            if !config.notify.recipients.contains(recipient) {
                config.notify.recipients.push(recipient.clone());
            }
        }

        config.runtime.verbose |= self.verbose;
        config.runtime.pretend |= self.pretend;
        config.runtime.daemonize |= self.daemonize;
    }
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<SupervisorConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load the optional config file, apply overrides, and validate the result.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<SupervisorConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content =
                fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
            parse_config(&content)?
        }
        None => SupervisorConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

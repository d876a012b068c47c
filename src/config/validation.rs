//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required paths present and mutually distinct
//! - Value ranges (timeouts and interval > 0)
//! - Absolute paths when running detached
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SupervisorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::SupervisorConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("paths.{0} is required")]
    MissingPath(&'static str),

    #[error("{name} must be absolute when daemonizing: {path}")]
    RelativePath { name: &'static str, path: PathBuf },

    #[error("paths.{first} and paths.{second} must differ")]
    SamePath {
        first: &'static str,
        second: &'static str,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    EmptyProgram(&'static str),

    #[error("observability.log_file is required when daemonizing")]
    DetachedWithoutLog,

    #[error("invalid observability.log_level {0:?}")]
    LogLevel(String),

    #[error("invalid observability.metrics_address {0:?}")]
    MetricsAddress(String),
}

pub fn validate_config(config: &SupervisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let paths = &config.paths;
    let detached = config.runtime.daemonize;

    let named = [
        ("link", &paths.link),
        ("primary", &paths.primary),
        ("secondary", &paths.secondary),
    ];
    for (name, path) in named {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::MissingPath(name));
        } else if detached && !path.is_absolute() {
            errors.push(ValidationError::RelativePath {
                name,
                path: path.clone(),
            });
        }
    }

    for (i, (first, a)) in named.iter().enumerate() {
        for (second, b) in &named[i + 1..] {
            if !a.as_os_str().is_empty() && same_path(a, b) {
                errors.push(ValidationError::SamePath {
                    first: *first,
                    second: *second,
                });
            }
        }
    }

    for (name, value) in [
        ("sync.timeout_ms", config.sync.timeout_ms),
        ("sync.interval_ms", config.sync.interval_ms),
        ("probe.timeout_ms", config.probe.timeout_ms),
        ("notify.timeout_ms", config.notify.timeout_ms),
        ("runner.kill_poll_attempts", u64::from(config.runner.kill_poll_attempts)),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.sync.program.trim().is_empty() {
        errors.push(ValidationError::EmptyProgram("sync.program"));
    }
    if !config.notify.recipients.is_empty() && config.notify.mail_program.trim().is_empty() {
        errors.push(ValidationError::EmptyProgram("notify.mail_program"));
    }

    let observability = &config.observability;
    if detached {
        match &observability.log_file {
            None => errors.push(ValidationError::DetachedWithoutLog),
            Some(path) if !path.is_absolute() => errors.push(ValidationError::RelativePath {
                name: "observability.log_file",
                path: path.clone(),
            }),
            Some(_) => {}
        }
        if let Some(path) = observability.command_output.as_ref().filter(|p| !p.is_absolute()) {
            errors.push(ValidationError::RelativePath {
                name: "observability.command_output",
                path: path.clone(),
            });
        }
    }

    if EnvFilter::try_new(&observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Textual comparison after stripping trailing separators; targets are not
/// touched since the primary may be hung.
fn same_path(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SupervisorConfig {
        let mut config = SupervisorConfig::default();
        config.paths.link = "/srv/data".into();
        config.paths.primary = "/mnt/nfs/data".into();
        config.paths.secondary = "/var/lib/data".into();
        config
    }

    #[test]
    fn valid_config_passes() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = valid();
        config.paths.secondary = "/mnt/nfs/data/".into();
        config.sync.timeout_ms = 0;
        config.sync.interval_ms = 0;
        config.sync.program = " ".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::SamePath {
                    first: "primary",
                    second: "secondary"
                },
                ValidationError::Zero("sync.timeout_ms"),
                ValidationError::Zero("sync.interval_ms"),
                ValidationError::EmptyProgram("sync.program"),
            ]
        );
    }

    #[test]
    fn detached_requires_absolute_paths_and_log_file() {
        let mut config = valid();
        config.runtime.daemonize = true;
        config.paths.link = "data".into();
        config.observability.command_output = Some("out.log".into());

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::RelativePath {
            name: "link",
            path: "data".into()
        }));
        assert!(errors.contains(&ValidationError::DetachedWithoutLog));
        assert!(errors.contains(&ValidationError::RelativePath {
            name: "observability.command_output",
            path: "out.log".into()
        }));
    }

    #[test]
    fn relative_paths_allowed_in_foreground() {
        let mut config = valid();
        config.paths.link = "data".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = valid();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("nowhere".into())]
        );
    }

    #[test]
    fn bad_log_level_rejected() {
        let mut config = valid();
        config.observability.log_level = "linkguard=shouting".into();
        assert!(validate_config(&config).is_err());
    }
}

//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::DashboardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file into a configuration without validating it.
pub fn read_config_file(path: &Path) -> Result<DashboardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so the overlay can be exercised
/// without mutating the process environment.
pub fn apply_env<F>(config: &mut DashboardConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
        config.listener.port = port.trim().parse().map_err(|e| ConfigError::Env {
            var: "PORT",
            reason: format!("{e}"),
        })?;
    }

    if let Some(project_id) = lookup("DOMINO_PROJECT_ID") {
        config.domino.project_id = project_id;
    }

    if let Some(run_host_path) = lookup("DOMINO_RUN_HOST_PATH") {
        config.domino.run_host_path = run_host_path;
    }

    if let Some(domain) = lookup("DOMINO_DOMAIN").filter(|d| !d.trim().is_empty()) {
        config.domino.domain = domain.trim().to_string();
    }

    if let Some(api_key) = lookup("DOMINO_API_KEY") {
        config.domino.api_key = Some(api_key).filter(|k| !k.trim().is_empty());
    }

    Ok(())
}

/// Command-line values. They win over the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut DashboardConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// Build the startup configuration: defaults, optional file, environment,
/// then command-line overrides.
///
/// The result is validated once, after every layer is applied.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<DashboardConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => DashboardConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

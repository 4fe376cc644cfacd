use crate::cli::{Cli, Command};
use crate::engine::Severity;
use crate::error::{ConfigError, ConfigResult as Result};
use crate::output::DiagnosticsFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Trait for abstracting environment variable access
pub trait EnvProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub network: NetworkConfig,
    pub paths: PathsConfig,
    pub server: ServerConfig,
}

/// Validation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Lowest severity that makes a document invalid (error, warn, info, hint)
    pub fail_severity: String,
    /// Rendering used for diagnostics
    pub diagnostics_format: String,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// User agent sent with document and reference fetches
    pub user_agent: String,
    /// Let the authenticated resolver fetch plain `http` refs as well
    pub allow_insecure_refs: bool,
}

/// Locations of the per-user files read during validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Auth table used by the reference resolver
    pub auth_config: PathBuf,
    /// Saved context store
    pub context_file: PathBuf,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

fn app_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("govlint")
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            fail_severity: "error".to_string(),
            diagnostics_format: DiagnosticsFormat::Stylish.name().to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("govlint/{}", env!("CARGO_PKG_VERSION")),
            allow_insecure_refs: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let dir = app_config_dir();
        Self {
            auth_config: dir.join("auth.json"),
            context_file: dir.join("context.json"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let config = match &cli.config {
            Some(config_path) => Self::load_from_file(config_path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        let config = Self::apply_environment_overrides(config)?;
        let config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<Config>(&content) {
                Ok(config) => Ok(config),
                Err(_) => Ok(serde_json::from_str(&content)?),
            },
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = ["govlint.toml", "govlint.json", ".govlint.toml", ".govlint.json"];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        let app_dir = app_config_dir();
        for name in &config_names {
            let path = app_dir.join(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(severity) = env.get("GOVLINT_FAIL_SEVERITY") {
            severity.parse::<Severity>().map_err(|_| {
                ConfigError::Environment(format!("Invalid GOVLINT_FAIL_SEVERITY value: {}", severity))
            })?;
            config.validation.fail_severity = severity;
        }

        if let Some(format) = env.get("GOVLINT_DIAGNOSTICS_FORMAT") {
            config.validation.diagnostics_format = format;
        }

        if let Some(path) = env.get("GOVLINT_AUTH_CONFIG") {
            config.paths.auth_config = PathBuf::from(path);
        }

        if let Some(path) = env.get("GOVLINT_CONTEXT_FILE") {
            config.paths.context_file = PathBuf::from(path);
        }

        if let Some(user_agent) = env.get("GOVLINT_USER_AGENT") {
            config.network.user_agent = user_agent;
        }

        if let Some(bind) = env.get("GOVLINT_BIND") {
            config.server.bind = bind;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        match &cli.command {
            Command::Validate(args) => {
                if let Some(severity) = args.fail_severity {
                    config.validation.fail_severity = severity.label().to_string();
                }
                if let Some(format) = &args.diagnostics_format {
                    config.validation.diagnostics_format = format.clone();
                }
            }
            Command::Serve(args) => {
                if let Some(bind) = &args.bind {
                    config.server.bind = bind.clone();
                }
            }
        }
        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        config
            .validation
            .fail_severity
            .parse::<Severity>()
            .map_err(ConfigError::Validation)?;

        if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid bind address: {}",
                config.server.bind
            )));
        }

        if config.network.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "User agent must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the effective fail severity
    pub fn fail_severity(config: &Config) -> Severity {
        config
            .validation
            .fail_severity
            .parse()
            .unwrap_or(Severity::Error)
    }
}

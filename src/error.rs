use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::RulesetError;

/// Which lookup failed when no document content could be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    File,
    Url,
    Alias,
    Context,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lookup::File => "file",
            Lookup::Url => "url",
            Lookup::Alias => "alias",
            Lookup::Context => "context",
        };
        f.write_str(name)
    }
}

fn describe_not_found(lookup: Lookup, target: &str) -> String {
    match lookup {
        Lookup::File => format!("File not found: {}", target),
        Lookup::Url => format!("Could not fetch document from {}", target),
        Lookup::Alias => format!("No saved context named '{}'", target),
        Lookup::Context => {
            "No document reference given and no saved context or spec file found".to_string()
        }
    }
}

/// Main error type for loading, resolving and validating documents
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("{}", describe_not_found(*.lookup, .target))]
    DocumentNotFound { lookup: Lookup, target: String },

    #[error("Could not connect to proxy {proxy} while fetching {url}")]
    ProxyConnection {
        url: String,
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch {url}: {status}")]
    NetworkFetch { url: String, status: String },

    #[error("Invalid URL '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    #[error("Unsupported output file type '{extension}' for {path}")]
    InvalidOutputFormat { path: PathBuf, extension: String },

    #[error("Output file {path} should have extension '.{expected}' for the {format} format")]
    InvalidOutputExtension {
        path: PathBuf,
        expected: String,
        format: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ruleset error: {0}")]
    Ruleset(#[from] RulesetError),
}

impl GovernanceError {
    /// Stable slug used as the CLI prefix and the HTTP problem `type`
    pub fn kind(&self) -> &'static str {
        match self {
            GovernanceError::DocumentNotFound { .. } => "document-not-found",
            GovernanceError::ProxyConnection { .. } => "proxy-connection-error",
            GovernanceError::NetworkFetch { .. } => "network-fetch-error",
            GovernanceError::InvalidUrl { .. } => "invalid-url",
            GovernanceError::InvalidOutputFormat { .. } => "invalid-output-format",
            GovernanceError::InvalidOutputExtension { .. } => "invalid-output-extension",
            GovernanceError::Io(_) => "io-error",
            GovernanceError::Http(_) => "http-error",
            GovernanceError::Config(_) => "configuration-error",
            GovernanceError::Ruleset(_) => "ruleset-error",
        }
    }

    /// Errors the caller reports as a warning and moves past
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            GovernanceError::InvalidOutputFormat { .. }
                | GovernanceError::InvalidOutputExtension { .. }
        )
    }

    pub(crate) fn not_found(lookup: Lookup, target: impl Into<String>) -> Self {
        GovernanceError::DocumentNotFound {
            lookup,
            target: target.into(),
        }
    }
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigError> for GovernanceError {
    fn from(err: ConfigError) -> Self {
        GovernanceError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, GovernanceError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

use crate::cli::VerbosityLevel;
use crate::error::{ConfigError, GovernanceError};

/// Error reporter with configurable verbosity
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    /// Report a hard error on stderr
    pub fn report(&self, error: &GovernanceError) {
        eprintln!("{}", self.format_error(error));
    }

    /// Report a non-fatal error; suppressed in quiet mode
    pub fn report_warning(&self, error: &GovernanceError) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("warning: {}", self.format_error(error));
        }
    }

    /// Report a configuration error
    pub fn report_config_error(&self, error: &ConfigError) {
        eprintln!(
            "configuration-error: {}\n{}",
            error,
            self.get_config_help(error)
        );
    }

    /// `<kind>: <message>`, plus suggestions and the source chain when verbose
    pub fn format_error(&self, error: &GovernanceError) -> String {
        let mut output = format!("{}: {}", error.kind(), error);

        if self.verbosity == VerbosityLevel::Verbose {
            if let Some(suggestion) = self.suggestion(error) {
                output.push_str(&format!("\nSuggestion: {}", suggestion));
            }

            let mut current: &dyn std::error::Error = error;
            let mut level = 0;
            while let Some(source) = current.source() {
                if level == 0 {
                    output.push_str("\nCaused by:");
                }
                output.push_str(&format!("\n  {}: {}", level + 1, source));
                current = source;
                level += 1;
            }
        }

        output
    }

    fn suggestion(&self, error: &GovernanceError) -> Option<String> {
        match error {
            GovernanceError::DocumentNotFound { .. } => Some(
                "Pass a file path or URL, or use --file/--url/--context to say which it is"
                    .to_string(),
            ),
            GovernanceError::ProxyConnection { proxy, .. } => {
                Some(format!("Check that the proxy at {} is running", proxy))
            }
            GovernanceError::InvalidOutputExtension { expected, .. } => {
                Some(format!("Use an output path ending in .{}", expected))
            }
            GovernanceError::Http(_) | GovernanceError::NetworkFetch { .. } => {
                Some("Check network connectivity and URL validity".to_string())
            }
            _ => None,
        }
    }

    /// Get helpful suggestions for configuration errors
    fn get_config_help(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
                "Check the configuration file syntax (TOML/JSON format expected)".to_string()
            }
            ConfigError::UnsupportedFormat(ext) => {
                format!("Rename the configuration file from .{} to .toml or .json", ext)
            }
            ConfigError::Environment(_) => {
                "Fix or unset the GOVLINT_* environment variable named above".to_string()
            }
            ConfigError::Validation(_) | ConfigError::Io(_) => {
                "Resolve conflicting configuration values between file, environment, and CLI"
                    .to_string()
            }
        }
    }
}

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::document_loader::ExplicitKind;
use crate::engine::Severity;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// Governance checks for API description documents
#[derive(Parser, Debug, Clone)]
#[command(name = "govlint")]
#[command(about = "Validate API description documents against a governance ruleset")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate a document and report governance issues
    Validate(ValidateArgs),
    /// Serve the validation endpoint over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Saved context name, file path or URL; append `+<proxy-url>` to a URL to fetch it through a proxy
    pub reference: Option<String>,

    /// Lowest severity that makes the document invalid
    #[arg(long = "fail-severity", value_parser = parse_severity)]
    pub fail_severity: Option<Severity>,

    /// stylish, json, junit, html, text, teamcity or pretty
    #[arg(short = 'f', long = "diagnostics-format")]
    pub diagnostics_format: Option<String>,

    /// Write the rendered diagnostics to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Rules to switch off for this run
    #[arg(long = "suppress-warnings", value_delimiter = ',')]
    pub suppress_warnings: Vec<String>,

    /// Switch off every rule the document violates
    #[arg(long = "suppress-all-warnings")]
    pub suppress_all_warnings: bool,

    /// Treat the reference as a file path
    #[arg(long = "file", conflicts_with_all = ["url", "context"])]
    pub file: bool,

    /// Treat the reference as a URL
    #[arg(long = "url", conflicts_with = "context")]
    pub url: bool,

    /// Treat the reference as a saved context name
    #[arg(long = "context")]
    pub context: bool,

    /// Only print diagnostics at or above the fail severity
    #[arg(short = 'D', long = "display-only-failures")]
    pub display_only_failures: bool,
}

impl ValidateArgs {
    pub fn explicit_kind(&self) -> Option<ExplicitKind> {
        if self.file {
            Some(ExplicitKind::File)
        } else if self.url {
            Some(ExplicitKind::Url)
        } else if self.context {
            Some(ExplicitKind::Context)
        } else {
            None
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long = "bind")]
    pub bind: Option<String>,
}

fn parse_severity(value: &str) -> Result<Severity, String> {
    value.parse()
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

//! # govlint Library
//!
//! Validates API description documents against a governance ruleset. A
//! reference (saved context, file path, URL or URL+proxy) is loaded into text,
//! parsed with nested `$ref`s fetched through an authentication-aware resolver,
//! checked against the ruleset with optional rule suppression, and judged
//! against a fail severity.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod document_loader;
pub mod engine;
pub mod error;
pub mod error_reporter;
pub mod http_client;
pub mod output;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod validator;

pub use auth::{AuthConfig, AuthConfigStore, AuthEntry, FileAuthConfigStore};
pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager, EnvProvider, SystemEnvProvider};
pub use context::{AliasStore, FileAliasStore, SavedContext};
pub use document_loader::{DocumentLoader, ExplicitKind, LoadedDocument, SourceKind};
pub use engine::{Diagnostic, EngineConfig, Ruleset, Severity, engine_for};
pub use error::{GovernanceError, Lookup};
pub use error_reporter::ErrorReporter;
pub use http_client::{AsyncHttpClient, HttpClientConfig};
pub use output::{DiagnosticsFormat, Output};
pub use reference::{ClassifiedReference, ReferenceKind, classify};
pub use report::{GovernanceSummary, SummaryLevel, governance_summary};
pub use resolver::{AuthenticatedFetchResolver, rewrite_blob_url};
pub use validator::{
    Scorer, SeverityWeightedScorer, ValidateOptions, ValidationEngine, ValidationVerdict,
    VerdictStatus, parse_invalid_rule_names,
};

//! Document parsing and rule engine.
//!
//! The engine turns document text into a parsed value plus diagnostics. It is
//! configured once from an immutable [`EngineConfig`] (resolvers, format
//! parsers, ruleset) through [`engine_for`]; changing which rules run means
//! building another engine, never mutating an existing one.
//!
//! Nested `$ref`s are fetched through priority-ordered [`Resolver`]s. The
//! engine registers its own file and HTTP resolvers at priority 0, so any
//! resolver registered with a higher priority is asked first. Broken refs are
//! reported as `invalid-ref` diagnostics rather than errors.

pub mod diagnostic;
mod refs;
pub mod rules;
mod ruleset;

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::{GovernanceError, Lookup, Result};
use refs::{BaseLocation, RefWalker};
use rules::{Finding, INVALID_REF, PARSER, RuleDefinition};

pub use diagnostic::{Diagnostic, Position, Range, Severity, locate};
pub use ruleset::{RECOMMENDED, RuleSetting, Ruleset, RulesetError};

/// A pluggable fetcher for the bytes behind a reference URI
#[async_trait]
pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;

    /// Higher priorities are consulted first
    fn priority(&self) -> i32 {
        0
    }

    fn can_read(&self, uri: &str) -> bool;

    async fn read(&self, uri: &str) -> Result<String>;
}

/// A named sub-parser for one document syntax
pub trait FormatParser: Send + Sync {
    fn name(&self) -> &str;
    fn accepts(&self, text: &str) -> bool;
    fn parse(&self, text: &str) -> std::result::Result<Value, String>;
}

pub struct JsonFormat;

impl FormatParser for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn accepts(&self, text: &str) -> bool {
        let trimmed = text.trim_start();
        trimmed.starts_with('{') || trimmed.starts_with('[')
    }

    fn parse(&self, text: &str) -> std::result::Result<Value, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }
}

pub struct YamlFormat;

impl FormatParser for YamlFormat {
    fn name(&self) -> &str {
        "yaml"
    }

    fn accepts(&self, _text: &str) -> bool {
        true
    }

    fn parse(&self, text: &str) -> std::result::Result<Value, String> {
        serde_yaml::from_str::<serde_yaml::Value>(text)
            .map(yaml_to_json)
            .map_err(|e| e.to_string())
    }
}

// YAML allows non-string keys (`200:` under responses); JSON does not.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => serde_json::to_value(&n).unwrap_or(Value::Null),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

pub(crate) fn parse_text(
    formats: &[Arc<dyn FormatParser>],
    text: &str,
) -> std::result::Result<Value, String> {
    let mut last_error = None;
    for format in formats.iter().filter(|format| format.accepts(text)) {
        match format.parse(text) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(format!("{}: {}", format.name(), e)),
        }
    }
    Err(last_error.unwrap_or_else(|| "no registered format accepts this document".to_string()))
}

/// Reads local paths and `file://` URLs
pub struct FileResolver;

#[async_trait]
impl Resolver for FileResolver {
    fn name(&self) -> &str {
        "file"
    }

    fn can_read(&self, uri: &str) -> bool {
        !uri.starts_with("http://") && !uri.starts_with("https://")
    }

    async fn read(&self, uri: &str) -> Result<String> {
        let path = match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| GovernanceError::not_found(Lookup::File, uri))?,
            _ => uri.into(),
        };
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| GovernanceError::not_found(Lookup::File, path.display().to_string()))
    }
}

/// Unauthenticated HTTP(S) fetches
#[derive(Default)]
pub struct HttpResolver {
    client: reqwest::Client,
}

#[async_trait]
impl Resolver for HttpResolver {
    fn name(&self) -> &str {
        "http"
    }

    fn can_read(&self, uri: &str) -> bool {
        uri.starts_with("http://") || uri.starts_with("https://")
    }

    async fn read(&self, uri: &str) -> Result<String> {
        let response = self.client.get(uri).send().await?;
        if !response.status().is_success() {
            return Err(GovernanceError::NetworkFetch {
                url: uri.to_string(),
                status: response.status().to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Immutable description of an engine instance
#[derive(Clone)]
pub struct EngineConfig {
    pub resolvers: Vec<Arc<dyn Resolver>>,
    pub formats: Vec<Arc<dyn FormatParser>>,
    pub ruleset: Ruleset,
    pub cache_refs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolvers: Vec::new(),
            formats: vec![Arc::new(JsonFormat), Arc::new(YamlFormat)],
            ruleset: Ruleset::default(),
            cache_refs: false,
        }
    }
}

impl EngineConfig {
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    pub fn with_ruleset(mut self, ruleset: Ruleset) -> Self {
        self.ruleset = ruleset;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions<'a> {
    /// Location of the document, used for relative refs and diagnostics
    pub source: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub document: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Engine {
    resolvers: Vec<Arc<dyn Resolver>>,
    formats: Vec<Arc<dyn FormatParser>>,
    rules: Vec<(&'static RuleDefinition, Severity)>,
    ref_cache: Option<Mutex<HashMap<String, String>>>,
}

/// Build an engine from a configuration.
///
/// Fails when the ruleset names a rule or ruleset the engine does not know.
pub fn engine_for(config: &EngineConfig) -> std::result::Result<Engine, RulesetError> {
    let rules = config.ruleset.compile()?;

    let mut resolvers = config.resolvers.clone();
    resolvers.push(Arc::new(FileResolver));
    resolvers.push(Arc::new(HttpResolver::default()));
    resolvers.sort_by_key(|resolver| Reverse(resolver.priority()));

    Ok(Engine {
        resolvers,
        formats: config.formats.clone(),
        rules,
        ref_cache: config.cache_refs.then(|| Mutex::new(HashMap::new())),
    })
}

impl Engine {
    pub async fn parse(&self, text: &str, options: &ParseOptions<'_>) -> ParseOutput {
        let mut diagnostics = Vec::new();

        let mut document = match parse_text(&self.formats, text) {
            Ok(document) => document,
            Err(message) => {
                if let Some(severity) = self.severity_of(PARSER) {
                    let finding = Finding {
                        path: Vec::new(),
                        message,
                    };
                    diagnostics.push(self.diagnostic(PARSER, finding, severity, text, options));
                }
                return ParseOutput {
                    document: None,
                    diagnostics,
                };
            }
        };

        let mut ref_findings = Vec::new();
        let walker = RefWalker {
            resolvers: &self.resolvers,
            formats: &self.formats,
            cache: self.ref_cache.as_ref(),
        };
        walker
            .resolve(
                &mut document,
                BaseLocation::from_source(options.source),
                None,
                Vec::new(),
                &mut ref_findings,
            )
            .await;

        if let Some(severity) = self.severity_of(INVALID_REF) {
            for finding in ref_findings {
                diagnostics.push(self.diagnostic(INVALID_REF, finding, severity, text, options));
            }
        }

        for (rule, severity) in &self.rules {
            for finding in rule.check(&document) {
                diagnostics.push(self.diagnostic(rule.name, finding, *severity, text, options));
            }
        }

        ParseOutput {
            document: Some(document),
            diagnostics,
        }
    }

    /// Names of the rules this engine runs
    pub fn active_rules(&self) -> Vec<&'static str> {
        self.rules.iter().map(|(rule, _)| rule.name).collect()
    }

    fn severity_of(&self, name: &str) -> Option<Severity> {
        self.rules
            .iter()
            .find(|(rule, _)| rule.name == name)
            .map(|(_, severity)| *severity)
    }

    fn diagnostic(
        &self,
        code: &str,
        finding: Finding,
        severity: Severity,
        text: &str,
        options: &ParseOptions<'_>,
    ) -> Diagnostic {
        Diagnostic {
            code: code.to_string(),
            message: finding.message,
            range: locate(text, &finding.path),
            path: finding.path,
            severity,
            source: Some(options.source.to_string()),
        }
    }
}

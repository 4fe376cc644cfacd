//! Validation Engine
//!
//! Wraps the document engine and decides the verdict:
//! - **Default instance**: built once, with the authenticated resolver
//!   registered and the reference cache off, used whenever nothing is suppressed
//! - **Suppressing instances**: built per call from the same base configuration
//!   with the suppressed rules switched off, then dropped
//! - **Verdict**: a pure function of the diagnostics and the fail severity
//!
//! Suppressing every violated rule needs two passes, because the set of rules a
//! document trips is only known after the default instance has run once.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document_loader::LoadedDocument;
use crate::engine::{
    Diagnostic, Engine, EngineConfig, ParseOptions, ParseOutput, Ruleset, Severity, engine_for,
};
use crate::error::Result;
use crate::resolver::AuthenticatedFetchResolver;

/// Per-call validation options
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateOptions {
    pub fail_severity: Severity,
    pub suppress_warnings: Vec<String>,
    pub suppress_all_warnings: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            fail_severity: Severity::Error,
            suppress_warnings: Vec::new(),
            suppress_all_warnings: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Valid,
    Invalid,
}

impl VerdictStatus {
    pub fn is_valid(self) -> bool {
        self == VerdictStatus::Valid
    }
}

/// `Invalid` iff some diagnostic is at least as severe as `fail_severity`
pub fn verdict_status(diagnostics: &[Diagnostic], fail_severity: Severity) -> VerdictStatus {
    if diagnostics.iter().any(|d| d.severity.fails(fail_severity)) {
        VerdictStatus::Invalid
    } else {
        VerdictStatus::Valid
    }
}

/// Outcome of one validation call
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationVerdict {
    pub diagnostics: Vec<Diagnostic>,
    pub fail_severity: Severity,
    pub score: Option<f64>,
    /// Parsed document with external refs inlined, absent on syntax errors
    pub document: Option<Value>,
    /// Rules switched off for this call
    pub suppressed_rules: Vec<String>,
    /// Requested suppressions dropped because the engine does not know them
    pub ignored_rules: Vec<String>,
}

impl ValidationVerdict {
    pub fn status(&self) -> VerdictStatus {
        verdict_status(&self.diagnostics, self.fail_severity)
    }

    pub fn is_valid(&self) -> bool {
        self.status().is_valid()
    }
}

/// Scores a validated document
pub trait Scorer: Send + Sync {
    fn score(&self, document: &Value, diagnostics: &[Diagnostic]) -> Option<f64>;
}

/// 100 minus a fixed weight per diagnostic, never below zero
#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityWeightedScorer;

impl SeverityWeightedScorer {
    fn weight(severity: Severity) -> f64 {
        match severity {
            Severity::Error => 10.0,
            Severity::Warning => 5.0,
            Severity::Information => 1.0,
            Severity::Hint => 0.0,
        }
    }
}

impl Scorer for SeverityWeightedScorer {
    fn score(&self, _document: &Value, diagnostics: &[Diagnostic]) -> Option<f64> {
        let penalty: f64 = diagnostics.iter().map(|d| Self::weight(d.severity)).sum();
        Some((100.0 - penalty).max(0.0))
    }
}

fn invalid_rule_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"Cannot extend non-existing rule: "([^"]+)""#)
            .expect("Failed to compile invalid rule regex")
    })
}

/// Rule names listed in an engine construction error, in message order
pub fn parse_invalid_rule_names(message: &str) -> Vec<String> {
    invalid_rule_regex()
        .captures_iter(message)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Engine built for one call, plus what was actually switched off
struct Suppression {
    engine: Option<Engine>,
    applied: Vec<String>,
    ignored: Vec<String>,
}

pub struct ValidationEngine {
    base: EngineConfig,
    default_engine: Engine,
    scorer: Option<Arc<dyn Scorer>>,
}

impl ValidationEngine {
    /// Build the default instance from `base`; its ruleset must be valid
    pub fn new(base: EngineConfig) -> Result<Self> {
        let default_engine = engine_for(&base)?;
        Ok(Self {
            base,
            default_engine,
            scorer: Some(Arc::new(SeverityWeightedScorer)),
        })
    }

    /// Default configuration with the authenticated resolver registered
    pub fn with_resolver(resolver: AuthenticatedFetchResolver) -> Result<Self> {
        let mut base = EngineConfig::default().with_resolver(Arc::new(resolver));
        base.cache_refs = false;
        Self::new(base)
    }

    pub fn with_scorer(mut self, scorer: Option<Arc<dyn Scorer>>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Parse with the default instance, nothing suppressed
    pub async fn parse(&self, document: &LoadedDocument) -> ParseOutput {
        Self::run(&self.default_engine, document).await
    }

    pub async fn validate(
        &self,
        document: &LoadedDocument,
        options: &ValidateOptions,
    ) -> ValidationVerdict {
        let requested = if options.suppress_all_warnings {
            let discovered: BTreeSet<String> = self
                .parse(document)
                .await
                .diagnostics
                .into_iter()
                .map(|d| d.code)
                .collect();
            tracing::debug!(rules = ?discovered, "suppressing every triggered rule");
            discovered.into_iter().collect()
        } else {
            options.suppress_warnings.clone()
        };

        let suppression = self.suppressing_engine(requested);
        let engine = suppression.engine.as_ref().unwrap_or(&self.default_engine);
        let output = Self::run(engine, document).await;

        let score = match (&self.scorer, &output.document) {
            (Some(scorer), Some(parsed)) => scorer.score(parsed, &output.diagnostics),
            _ => None,
        };

        ValidationVerdict {
            diagnostics: output.diagnostics,
            fail_severity: options.fail_severity,
            score,
            document: output.document,
            suppressed_rules: suppression.applied,
            ignored_rules: suppression.ignored,
        }
    }

    /// Validate several documents concurrently with the same options
    pub async fn validate_all(
        &self,
        documents: &[LoadedDocument],
        options: &ValidateOptions,
    ) -> Vec<ValidationVerdict> {
        join_all(documents.iter().map(|document| self.validate(document, options))).await
    }

    async fn run(engine: &Engine, document: &LoadedDocument) -> ParseOutput {
        let options = ParseOptions {
            source: &document.source_label,
        };
        engine.parse(&document.text, &options).await
    }

    /// Build an engine with `rules` off, dropping names the engine rejects
    fn suppressing_engine(&self, mut rules: Vec<String>) -> Suppression {
        rules.sort();
        rules.dedup();
        let mut ignored = Vec::new();

        loop {
            if rules.is_empty() {
                return Suppression {
                    engine: None,
                    applied: rules,
                    ignored,
                };
            }

            let config = self
                .base
                .clone()
                .with_ruleset(Ruleset::disabling(rules.iter().cloned()));
            let error = match engine_for(&config) {
                Ok(engine) => {
                    return Suppression {
                        engine: Some(engine),
                        applied: rules,
                        ignored,
                    };
                }
                Err(e) => e,
            };

            let invalid = parse_invalid_rule_names(&error.to_string());
            let before = rules.len();
            rules.retain(|rule| !invalid.contains(rule));
            if rules.len() == before {
                tracing::warn!(error = %error, "could not build suppressing engine; nothing suppressed");
                ignored.append(&mut rules);
                continue;
            }
            for name in &invalid {
                tracing::warn!(rule = %name, "ignoring unknown rule in suppression list");
            }
            ignored.extend(invalid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const DOCUMENT: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
servers:
  - url: https://api.example.com
paths:
  /pets:
    get:
      operationId: listPets
      description: List pets
      tags: [pets]
"#;

    fn engine() -> ValidationEngine {
        ValidationEngine::new(EngineConfig::default()).unwrap()
    }

    fn document() -> LoadedDocument {
        LoadedDocument::inline(DOCUMENT, "pets.yaml")
    }

    fn codes(verdict: &ValidationVerdict) -> Vec<&str> {
        verdict.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_parse_invalid_rule_names() {
        let message = "Cannot extend non-existing rule: \"foo\"\nCannot extend non-existing rule: \"bar-baz\"";
        assert_eq!(parse_invalid_rule_names(message), vec!["foo", "bar-baz"]);
        assert!(parse_invalid_rule_names("something else").is_empty());
    }

    #[test]
    fn test_verdict_status_grid() {
        let cases = [
            (Severity::Error, vec![], VerdictStatus::Valid),
            (Severity::Hint, vec![], VerdictStatus::Valid),
            (Severity::Error, vec![Severity::Warning], VerdictStatus::Valid),
            (Severity::Warning, vec![Severity::Warning], VerdictStatus::Invalid),
            (Severity::Information, vec![Severity::Hint], VerdictStatus::Valid),
            (Severity::Hint, vec![Severity::Hint], VerdictStatus::Invalid),
            (Severity::Hint, vec![Severity::Error], VerdictStatus::Invalid),
        ];
        for (threshold, severities, expected) in cases {
            let diagnostics: Vec<_> = severities
                .into_iter()
                .map(|s| Diagnostic::new("rule", "message", s))
                .collect();
            assert_eq!(
                verdict_status(&diagnostics, threshold),
                expected,
                "{threshold:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_default_validation() {
        let verdict = engine().validate(&document(), &ValidateOptions::default()).await;
        assert_eq!(codes(&verdict), vec!["info-description", "info-contact", "info-license"]);
        assert!(verdict.is_valid());
        assert_eq!(verdict.score, Some(89.0));
        assert!(verdict.suppressed_rules.is_empty());
    }

    #[tokio::test]
    async fn test_threshold_changes_status_not_diagnostics() {
        let options = ValidateOptions {
            fail_severity: Severity::Warning,
            ..Default::default()
        };
        let verdict = engine().validate(&document(), &options).await;
        assert_eq!(verdict.diagnostics.len(), 3);
        assert_eq!(verdict.status(), VerdictStatus::Invalid);
    }

    #[tokio::test]
    async fn test_suppress_all_warnings() {
        let options = ValidateOptions {
            suppress_all_warnings: true,
            ..Default::default()
        };
        let verdict = engine().validate(&document(), &options).await;
        assert!(verdict.diagnostics.is_empty());
        assert_eq!(
            verdict.suppressed_rules,
            vec!["info-contact", "info-description", "info-license"]
        );
    }

    #[tokio::test]
    async fn test_suppress_all_takes_precedence() {
        let options = ValidateOptions {
            suppress_all_warnings: true,
            suppress_warnings: vec!["not-a-rule".to_string()],
            ..Default::default()
        };
        let verdict = engine().validate(&document(), &options).await;
        assert!(verdict.diagnostics.is_empty());
        assert!(verdict.ignored_rules.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rule_name_is_dropped() {
        let options = ValidateOptions {
            suppress_warnings: vec!["info-contact".to_string(), "made-up".to_string()],
            ..Default::default()
        };
        let verdict = engine().validate(&document(), &options).await;
        assert_eq!(codes(&verdict), vec!["info-description", "info-license"]);
        assert_eq!(verdict.suppressed_rules, vec!["info-contact"]);
        assert_eq!(verdict.ignored_rules, vec!["made-up"]);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_invalid_rule_name_logs_one_warning() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let options = ValidateOptions {
            suppress_warnings: vec!["info-contact".to_string(), "made-up".to_string()],
            ..Default::default()
        };
        engine().validate(&document(), &options).await;

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<&str> = output.lines().filter(|line| line.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "{output}");
        assert!(warnings[0].contains("made-up"));
        assert!(!warnings[0].contains("info-contact"));
    }

    #[tokio::test]
    async fn test_only_invalid_names_means_no_suppression() {
        let options = ValidateOptions {
            suppress_warnings: vec!["made-up".to_string(), "also-made-up".to_string()],
            ..Default::default()
        };
        let verdict = engine().validate(&document(), &options).await;
        assert_eq!(verdict.diagnostics.len(), 3);
        assert!(verdict.suppressed_rules.is_empty());
        assert_eq!(verdict.ignored_rules, vec!["also-made-up", "made-up"]);
    }

    #[tokio::test]
    async fn test_syntax_error_has_no_score() {
        let broken = LoadedDocument::inline("openapi: [3", "broken.yaml");
        let verdict = engine().validate(&broken, &ValidateOptions::default()).await;
        assert_eq!(verdict.status(), VerdictStatus::Invalid);
        assert_eq!(verdict.score, None);
        assert!(verdict.document.is_none());
    }

    #[tokio::test]
    async fn test_validate_all_keeps_order() {
        let documents = vec![
            document(),
            LoadedDocument::inline("{\"openapi\": \"3.0.0\"}", "bare.json"),
        ];
        let verdicts = engine()
            .validate_all(&documents, &ValidateOptions::default())
            .await;
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].is_valid());
        assert!(!verdicts[1].is_valid());
    }

    #[test]
    fn test_scorer_floor() {
        let diagnostics: Vec<_> = (0..12)
            .map(|_| Diagnostic::new("rule", "message", Severity::Error))
            .collect();
        assert_eq!(
            SeverityWeightedScorer.score(&Value::Null, &diagnostics),
            Some(0.0)
        );
    }
}

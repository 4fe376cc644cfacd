mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{MapEnv, TestFixtures, auth_entry, resolver};
use govlint::{
    DocumentLoader, FileAliasStore, HttpClientConfig, LoadedDocument, Severity, SummaryLevel,
    ValidateOptions, ValidationEngine, ValidationVerdict, VerdictStatus, governance_summary,
};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROOT_WITH_REMOTE_REF: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
  description: Pet store
  contact:
    name: API team
  license:
    name: MIT
servers:
  - url: https://api.example.com
paths: {}
components:
  schemas:
    Pet:
      $ref: schemas/pet.yaml
"#;

fn engine() -> ValidationEngine {
    ValidationEngine::with_resolver(resolver(Vec::new(), MapEnv::default())).unwrap()
}

async fn load(path: &std::path::Path) -> LoadedDocument {
    let temp_dir = TempDir::new().unwrap();
    DocumentLoader::new(
        Arc::new(FileAliasStore::new(temp_dir.path().join("context.json"))),
        HttpClientConfig::default(),
    )
    .load(Some(&path.display().to_string()), None)
    .await
    .unwrap()
}

fn codes(verdict: &ValidationVerdict) -> BTreeSet<String> {
    verdict.diagnostics.iter().map(|d| d.code.clone()).collect()
}

#[tokio::test]
async fn test_compliant_document_is_valid() {
    let fixtures = TestFixtures::new();
    let document = load(&fixtures.valid()).await;

    let verdict = engine().validate(&document, &ValidateOptions::default()).await;
    assert!(verdict.diagnostics.is_empty(), "{:?}", verdict.diagnostics);
    assert_eq!(verdict.status(), VerdictStatus::Valid);
    assert_eq!(verdict.score, Some(100.0));

    let summary = governance_summary(&document.source_label, &verdict.diagnostics, verdict.status());
    assert_eq!(summary.level, SummaryLevel::Success);
    assert_eq!(
        summary.message,
        format!(
            "{} is valid! You don't have governance issues.",
            fixtures.valid().display()
        )
    );
}

#[tokio::test]
async fn test_missing_paths_is_invalid() {
    let fixtures = TestFixtures::new();
    let document = load(&fixtures.missing_paths()).await;

    let verdict = engine().validate(&document, &ValidateOptions::default()).await;
    assert_eq!(verdict.status(), VerdictStatus::Invalid);
    let schema_errors: Vec<_> = verdict
        .diagnostics
        .iter()
        .filter(|d| d.code == "oas-document-schema")
        .collect();
    assert_eq!(schema_errors.len(), 1);
    assert_eq!(schema_errors[0].severity, Severity::Error);
    assert!(schema_errors[0].message.contains("paths"));

    let summary = governance_summary(&document.source_label, &verdict.diagnostics, verdict.status());
    assert_eq!(summary.level, SummaryLevel::Error);
    assert!(summary.message.ends_with("has governance issues"));
}

#[tokio::test]
async fn test_warnings_and_local_ref() {
    let fixtures = TestFixtures::new();
    let document = load(&fixtures.with_warnings()).await;

    let verdict = engine().validate(&document, &ValidateOptions::default()).await;
    let expected: BTreeSet<String> = [
        "info-description",
        "info-contact",
        "info-license",
        "operation-operationId",
        "operation-description",
        "operation-tags",
        "tag-description",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(codes(&verdict), expected);
    assert!(verdict.is_valid());
    assert_eq!(verdict.score, Some(74.0));

    let parsed = verdict.document.unwrap();
    assert_eq!(parsed["components"]["schemas"]["Pet"]["type"], "object");
}

#[tokio::test]
async fn test_threshold_grid() {
    let fixtures = TestFixtures::new();
    let document = load(&fixtures.with_warnings()).await;
    let engine = engine();

    let cases = [
        (Severity::Error, VerdictStatus::Valid),
        (Severity::Warning, VerdictStatus::Invalid),
        (Severity::Information, VerdictStatus::Invalid),
        (Severity::Hint, VerdictStatus::Invalid),
    ];
    for (fail_severity, expected) in cases {
        let options = ValidateOptions {
            fail_severity,
            ..Default::default()
        };
        let verdict = engine.validate(&document, &options).await;
        assert_eq!(verdict.status(), expected, "{fail_severity:?}");
        assert_eq!(verdict.diagnostics.len(), 7);
    }

    // Only the hint remains once every warning-level rule is switched off.
    let options = ValidateOptions {
        fail_severity: Severity::Information,
        suppress_warnings: vec![
            "info-description".to_string(),
            "info-contact".to_string(),
            "info-license".to_string(),
            "operation-operationId".to_string(),
            "operation-description".to_string(),
            "operation-tags".to_string(),
        ],
        ..Default::default()
    };
    let verdict = engine.validate(&document, &options).await;
    assert_eq!(verdict.diagnostics.len(), 1);
    assert_eq!(verdict.diagnostics[0].severity, Severity::Hint);
    assert_eq!(verdict.status(), VerdictStatus::Valid);
}

#[tokio::test]
async fn test_suppress_all_removes_every_first_pass_rule() {
    let fixtures = TestFixtures::new();
    let engine = engine();

    for path in [fixtures.with_warnings(), fixtures.missing_paths()] {
        let document = load(&path).await;
        let first_pass = codes(&engine.validate(&document, &ValidateOptions::default()).await);

        let options = ValidateOptions {
            suppress_all_warnings: true,
            ..Default::default()
        };
        let verdict = engine.validate(&document, &options).await;

        assert!(codes(&verdict).is_disjoint(&first_pass), "{}", path.display());
        let suppressed: BTreeSet<String> = verdict.suppressed_rules.iter().cloned().collect();
        assert_eq!(suppressed, first_pass);
        assert!(verdict.is_valid());
    }
}

#[tokio::test]
async fn test_unknown_suppression_is_ignored_not_fatal() {
    let fixtures = TestFixtures::new();
    let document = load(&fixtures.with_warnings()).await;

    let options = ValidateOptions {
        suppress_warnings: vec!["tag-description".to_string(), "no-such-rule".to_string()],
        ..Default::default()
    };
    let verdict = engine().validate(&document, &options).await;
    assert!(!codes(&verdict).contains("tag-description"));
    assert_eq!(verdict.suppressed_rules, vec!["tag-description"]);
    assert_eq!(verdict.ignored_rules, vec!["no-such-rule"]);
    assert_eq!(verdict.diagnostics.len(), 6);
}

#[tokio::test]
async fn test_remote_ref_fetched_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/specs/schemas/pet.yaml"))
        .and(header("authorization", "Bearer private-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("type: object\nrequired: [name]\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = ValidationEngine::with_resolver(resolver(
        vec![auth_entry(&format!("{}/specs/**", server.uri()), "$PRIVATE_TOKEN")],
        MapEnv::with("PRIVATE_TOKEN", "private-token"),
    ))
    .unwrap();
    let document = LoadedDocument::inline(
        ROOT_WITH_REMOTE_REF,
        format!("{}/specs/openapi.yaml", server.uri()),
    );

    let verdict = engine.validate(&document, &ValidateOptions::default()).await;
    assert!(verdict.diagnostics.is_empty(), "{:?}", verdict.diagnostics);
    let parsed = verdict.document.unwrap();
    assert_eq!(parsed["components"]["schemas"]["Pet"]["type"], "object");
}

#[tokio::test]
async fn test_unresolvable_remote_ref_is_invalid_ref() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let document = LoadedDocument::inline(
        ROOT_WITH_REMOTE_REF,
        format!("{}/specs/openapi.yaml", server.uri()),
    );
    let verdict = engine().validate(&document, &ValidateOptions::default()).await;

    assert_eq!(verdict.diagnostics.len(), 1);
    let diagnostic = &verdict.diagnostics[0];
    assert_eq!(diagnostic.code, "invalid-ref");
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.path, vec!["components", "schemas", "Pet"]);
    assert!(diagnostic.message.contains("schemas/pet.yaml"));
    assert_eq!(verdict.status(), VerdictStatus::Invalid);
}

#[tokio::test]
async fn test_validate_all_reports_each_document() {
    let fixtures = TestFixtures::new();
    let documents = vec![
        load(&fixtures.valid()).await,
        load(&fixtures.missing_paths()).await,
    ];
    let verdicts = engine()
        .validate_all(&documents, &ValidateOptions::default())
        .await;

    let statuses: Vec<_> = verdicts.iter().map(|v| v.status()).collect();
    assert_eq!(statuses, vec![VerdictStatus::Valid, VerdictStatus::Invalid]);
}

//! Built-in governance rules.
//!
//! Each rule inspects the parsed document and reports findings as a path plus
//! a message. `parser` and `invalid-ref` have no document check of their own:
//! the engine raises them while parsing and resolving references, and the
//! catalog entry only makes them configurable.

use serde_json::{Map, Value};

use super::diagnostic::Severity;

pub const PARSER: &str = "parser";
pub const INVALID_REF: &str = "invalid-ref";

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A violation found by a rule before severity and range are attached
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub path: Vec<String>,
    pub message: String,
}

impl Finding {
    fn new(path: &[&str], message: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct RuleDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    check: fn(&Value) -> Vec<Finding>,
}

impl RuleDefinition {
    pub fn check(&self, document: &Value) -> Vec<Finding> {
        (self.check)(document)
    }
}

static CATALOG: [RuleDefinition; 12] = [
    RuleDefinition {
        name: PARSER,
        description: "Document must be well-formed JSON or YAML.",
        severity: Severity::Error,
        check: no_findings,
    },
    RuleDefinition {
        name: INVALID_REF,
        description: "Every $ref must resolve.",
        severity: Severity::Error,
        check: no_findings,
    },
    RuleDefinition {
        name: "oas-document-schema",
        description: "Document must declare a version, an info object and paths.",
        severity: Severity::Error,
        check: document_schema,
    },
    RuleDefinition {
        name: "info-title",
        description: "Info object must have a non-empty title.",
        severity: Severity::Error,
        check: info_title,
    },
    RuleDefinition {
        name: "info-description",
        description: "Info object must have a description.",
        severity: Severity::Warning,
        check: info_description,
    },
    RuleDefinition {
        name: "info-contact",
        description: "Info object must have a contact object.",
        severity: Severity::Warning,
        check: info_contact,
    },
    RuleDefinition {
        name: "info-license",
        description: "Info object should have a license.",
        severity: Severity::Information,
        check: info_license,
    },
    RuleDefinition {
        name: "api-servers",
        description: "OpenAPI 3 documents must declare at least one server.",
        severity: Severity::Warning,
        check: api_servers,
    },
    RuleDefinition {
        name: "operation-operationId",
        description: "Operations must have an operationId.",
        severity: Severity::Warning,
        check: operation_operation_id,
    },
    RuleDefinition {
        name: "operation-description",
        description: "Operations must have a description.",
        severity: Severity::Warning,
        check: operation_description,
    },
    RuleDefinition {
        name: "operation-tags",
        description: "Operations must have at least one tag.",
        severity: Severity::Warning,
        check: operation_tags,
    },
    RuleDefinition {
        name: "tag-description",
        description: "Global tags should have a description.",
        severity: Severity::Hint,
        check: tag_description,
    },
];

pub fn catalog() -> &'static [RuleDefinition] {
    &CATALOG
}

/// One-line description of a built-in rule
pub fn describe(name: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|rule| rule.name == name)
        .map(|rule| rule.description)
}

fn no_findings(_: &Value) -> Vec<Finding> {
    Vec::new()
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

fn info(document: &Value) -> Option<&Map<String, Value>> {
    document.get("info").and_then(Value::as_object)
}

fn document_schema(document: &Value) -> Vec<Finding> {
    let Some(root) = document.as_object() else {
        return vec![Finding::new(&[], "Document root must be an object.")];
    };

    let mut findings = Vec::new();
    if !root.contains_key("openapi") && !root.contains_key("swagger") {
        findings.push(Finding::new(
            &[],
            "Document must declare an \"openapi\" or \"swagger\" version.",
        ));
    }
    match root.get("info") {
        None => findings.push(Finding::new(&[], "Document must have an \"info\" object.")),
        Some(value) if !value.is_object() => {
            findings.push(Finding::new(&["info"], "\"info\" must be an object."))
        }
        Some(_) => {}
    }
    match root.get("paths") {
        None => findings.push(Finding::new(&[], "Document must have a \"paths\" object.")),
        Some(value) if !value.is_object() => {
            findings.push(Finding::new(&["paths"], "\"paths\" must be an object."))
        }
        Some(_) => {}
    }
    findings
}

fn info_title(document: &Value) -> Vec<Finding> {
    match info(document) {
        Some(info) if !non_empty_str(info.get("title")) => {
            vec![Finding::new(&["info"], "Info object must have a non-empty \"title\".")]
        }
        _ => Vec::new(),
    }
}

fn info_description(document: &Value) -> Vec<Finding> {
    match info(document) {
        Some(info) if !non_empty_str(info.get("description")) => {
            vec![Finding::new(&["info"], "Info object must have a \"description\".")]
        }
        _ => Vec::new(),
    }
}

fn info_contact(document: &Value) -> Vec<Finding> {
    match info(document) {
        Some(info) if !info.get("contact").is_some_and(Value::is_object) => {
            vec![Finding::new(&["info"], "Info object must have a \"contact\" object.")]
        }
        _ => Vec::new(),
    }
}

fn info_license(document: &Value) -> Vec<Finding> {
    match info(document) {
        Some(info) if !info.contains_key("license") => {
            vec![Finding::new(&["info"], "Info object should have a \"license\".")]
        }
        _ => Vec::new(),
    }
}

fn api_servers(document: &Value) -> Vec<Finding> {
    if document.get("openapi").is_none() {
        return Vec::new();
    }
    match document.get("servers") {
        None => vec![Finding::new(&[], "OpenAPI \"servers\" must be present.")],
        Some(Value::Array(servers)) if servers.is_empty() => {
            vec![Finding::new(&["servers"], "OpenAPI \"servers\" must not be empty.")]
        }
        Some(_) => Vec::new(),
    }
}

/// Visit every operation as (path, method, operation object)
fn operations(document: &Value) -> Vec<(&str, &str, &Map<String, Value>)> {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };
    paths
        .iter()
        .filter_map(|(path, item)| item.as_object().map(|item| (path.as_str(), item)))
        .flat_map(|(path, item)| {
            item.iter().filter_map(move |(method, operation)| {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    return None;
                }
                operation
                    .as_object()
                    .map(|operation| (path, method.as_str(), operation))
            })
        })
        .collect()
}

fn operation_operation_id(document: &Value) -> Vec<Finding> {
    operations(document)
        .into_iter()
        .filter(|(_, _, operation)| !non_empty_str(operation.get("operationId")))
        .map(|(path, method, _)| {
            Finding::new(&["paths", path, method], "Operation must have \"operationId\".")
        })
        .collect()
}

fn operation_description(document: &Value) -> Vec<Finding> {
    operations(document)
        .into_iter()
        .filter(|(_, _, operation)| !non_empty_str(operation.get("description")))
        .map(|(path, method, _)| {
            Finding::new(
                &["paths", path, method],
                "Operation \"description\" must be present and non-empty string.",
            )
        })
        .collect()
}

fn operation_tags(document: &Value) -> Vec<Finding> {
    operations(document)
        .into_iter()
        .filter(|(_, _, operation)| {
            !operation
                .get("tags")
                .and_then(Value::as_array)
                .is_some_and(|tags| !tags.is_empty())
        })
        .map(|(path, method, _)| {
            Finding::new(
                &["paths", path, method],
                "Operation must have non-empty \"tags\" array.",
            )
        })
        .collect()
}

fn tag_description(document: &Value) -> Vec<Finding> {
    let Some(tags) = document.get("tags").and_then(Value::as_array) else {
        return Vec::new();
    };
    tags.iter()
        .enumerate()
        .filter(|(_, tag)| !non_empty_str(tag.get("description")))
        .map(|(index, _)| {
            Finding::new(
                &["tags", index.to_string().as_str()],
                "Tag object should have a \"description\".",
            )
        })
        .collect()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::diagnostic::Severity;
use super::rules::{RuleDefinition, catalog};

/// Name of the built-in ruleset every engine starts from
pub const RECOMMENDED: &str = "govlint:recommended";

/// Errors raised while building an engine from a ruleset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RulesetError {
    #[error("{}", unknown_rules_message(.names))]
    UnknownRules { names: Vec<String> },

    #[error("Cannot extend non-existing ruleset: \"{name}\"")]
    UnknownRuleset { name: String },
}

fn unknown_rules_message(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("Cannot extend non-existing rule: \"{}\"", name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-rule override inside a ruleset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetting {
    Off,
    Error,
    Warn,
    Info,
    Hint,
}

impl RuleSetting {
    fn severity(self) -> Option<Severity> {
        match self {
            RuleSetting::Off => None,
            RuleSetting::Error => Some(Severity::Error),
            RuleSetting::Warn => Some(Severity::Warning),
            RuleSetting::Info => Some(Severity::Information),
            RuleSetting::Hint => Some(Severity::Hint),
        }
    }
}

/// Ruleset object of the shape `{extends: [], rules: {name: "off"}}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSetting>,
}

impl Ruleset {
    /// Ruleset that switches off every named rule
    pub fn disabling<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extends: Vec::new(),
            rules: names
                .into_iter()
                .map(|name| (name.into(), RuleSetting::Off))
                .collect(),
        }
    }

    /// Resolve the active rules and their effective severities
    pub(crate) fn compile(&self) -> Result<Vec<(&'static RuleDefinition, Severity)>, RulesetError> {
        if let Some(name) = self.extends.iter().find(|name| name.as_str() != RECOMMENDED) {
            return Err(RulesetError::UnknownRuleset { name: name.clone() });
        }

        let rules = catalog();
        let unknown: Vec<String> = self
            .rules
            .keys()
            .filter(|name| !rules.iter().any(|rule| rule.name == name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(RulesetError::UnknownRules { names: unknown });
        }

        Ok(rules
            .iter()
            .filter_map(|rule| match self.rules.get(rule.name) {
                Some(setting) => setting.severity().map(|severity| (rule, severity)),
                None => Some((rule, rule.severity)),
            })
            .collect())
    }
}

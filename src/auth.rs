//! Per-user table of credentials for reference fetches.
//!
//! The file is a JSON object `{ "auth": [ { urlPattern, token, authType?, headers? } ] }`.
//! A missing file or a missing `auth` key means no entries. Entries that fail
//! to deserialize, or whose pattern is not a valid glob, are skipped with a
//! warning so one typo never disables the rest of the table.

use std::collections::BTreeMap;
use std::path::PathBuf;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EnvProvider;
use crate::error::{ConfigError, ConfigResult};

fn default_auth_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEntry {
    pub url_pattern: String,
    /// Literal token, or `$NAME` to read environment variable `NAME` at fetch time
    pub token: String,
    #[serde(default = "default_auth_type")]
    pub auth_type: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl AuthEntry {
    /// Token with any `$NAME` indirection substituted; unset variables give ""
    pub fn resolve_token(&self, env: &dyn EnvProvider) -> String {
        match self.token.strip_prefix('$') {
            Some(name) => env.get(name).unwrap_or_else(|| {
                tracing::debug!(variable = name, "auth token variable is not set");
                String::new()
            }),
            None => self.token.clone(),
        }
    }
}

/// Loaded entries with their compiled patterns, in file order
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    entries: Vec<(AuthEntry, GlobMatcher)>,
}

impl AuthConfig {
    pub fn new(entries: Vec<AuthEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|entry| match Glob::new(&entry.url_pattern) {
                Ok(glob) => {
                    let matcher = glob.compile_matcher();
                    Some((entry, matcher))
                }
                Err(e) => {
                    tracing::warn!(pattern = %entry.url_pattern, error = %e, "skipping auth entry with invalid pattern");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Parse the `{ auth: [...] }` document, skipping malformed entries
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let root: Value = serde_json::from_str(content)?;
        let raw_entries = match root.get("auth") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(ConfigError::Validation(
                    "\"auth\" must be an array of entries".to_string(),
                ));
            }
        };

        let entries = raw_entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<AuthEntry>(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping malformed auth entry");
                    None
                }
            })
            .collect();
        Ok(Self::new(entries))
    }

    /// First entry, in file order, whose pattern matches `url`
    pub fn find_match(&self, url: &str) -> Option<&AuthEntry> {
        self.entries
            .iter()
            .find(|(_, matcher)| matcher.is_match(url))
            .map(|(entry, _)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of auth entries, read afresh on every call
#[cfg_attr(test, mockall::automock)]
pub trait AuthConfigStore: Send + Sync {
    fn load(&self) -> AuthConfig;
}

/// Reads the auth table from a JSON file
#[derive(Debug, Clone)]
pub struct FileAuthConfigStore {
    path: PathBuf,
}

impl FileAuthConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuthConfigStore for FileAuthConfigStore {
    fn load(&self) -> AuthConfig {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AuthConfig::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read auth config");
                return AuthConfig::default();
            }
        };
        AuthConfig::from_json(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable auth config");
            AuthConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct MapEnv(HashMap<String, String>);

    impl EnvProvider for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    fn entry(pattern: &str, token: &str) -> AuthEntry {
        AuthEntry {
            url_pattern: pattern.to_string(),
            token: token.to_string(),
            auth_type: default_auth_type(),
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let config = AuthConfig::new(vec![
            entry("https://api.github.com/repos/acme/*", "first"),
            entry("https://api.github.com/**", "second"),
        ]);

        let matched = config
            .find_match("https://api.github.com/repos/acme/specs/contents/a.yaml?ref=main")
            .unwrap();
        assert_eq!(matched.token, "first");

        let matched = config
            .find_match("https://api.github.com/repos/other/x")
            .unwrap();
        assert_eq!(matched.token, "second");

        assert!(config.find_match("https://raw.githubusercontent.com/a/b").is_none());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let config = AuthConfig::from_json(
            r#"{"auth": [
                {"urlPattern": "https://a.example.com/*", "token": "t1"},
                {"token": "no pattern"},
                {"urlPattern": "https://b.example.com/[", "token": "bad glob"},
                {"urlPattern": "https://c.example.com/*", "token": "t3", "authType": "token",
                 "headers": {"Accept": "application/vnd.github.v3+json"}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(config.len(), 2);
        let matched = config.find_match("https://c.example.com/spec.yaml").unwrap();
        assert_eq!(matched.auth_type, "token");
        assert_eq!(matched.headers["Accept"], "application/vnd.github.v3+json");
        assert_eq!(
            config.find_match("https://a.example.com/x").unwrap().auth_type,
            "Bearer"
        );
    }

    #[test]
    fn test_missing_auth_key_means_no_entries() {
        assert!(AuthConfig::from_json("{}").unwrap().is_empty());
        assert!(AuthConfig::from_json(r#"{"other": 1}"#).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_means_no_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileAuthConfigStore::new(temp_dir.path().join("auth.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_store_reloads_on_every_call() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("auth.json");
        let store = FileAuthConfigStore::new(&path);

        std::fs::write(&path, r#"{"auth": []}"#).unwrap();
        assert!(store.load().is_empty());

        std::fs::write(
            &path,
            r#"{"auth": [{"urlPattern": "https://*", "token": "t"}]}"#,
        )
        .unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_env_token_substitution() {
        let env = MapEnv(HashMap::from([(
            "GITHUB_TOKEN".to_string(),
            "secret".to_string(),
        )]));

        assert_eq!(entry("*", "$GITHUB_TOKEN").resolve_token(&env), "secret");
        assert_eq!(entry("*", "$UNSET_TOKEN").resolve_token(&env), "");
        assert_eq!(entry("*", "literal").resolve_token(&env), "literal");
    }
}

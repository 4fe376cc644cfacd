//! Read-only view of the saved-context store.
//!
//! The store is a JSON file `{ "current": "<alias>", "store": { "<alias>": "<path>" } }`
//! maintained by other commands; validation only looks names up.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedContext {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub store: BTreeMap<String, String>,
}

#[cfg_attr(test, mockall::automock)]
pub trait AliasStore: Send + Sync {
    /// Path saved under `alias`
    fn get_path(&self, alias: &str) -> Option<String>;

    /// Path of the current context, if one is set and saved
    fn current_path(&self) -> Option<String>;
}

/// Saved contexts backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileAliasStore {
    path: PathBuf,
}

impl FileAliasStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or unreadable files read as an empty store
    pub fn load(&self) -> SavedContext {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(context) => Some(context),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable context file");
                    None
                }
            })
            .unwrap_or_default()
    }
}

impl AliasStore for FileAliasStore {
    fn get_path(&self, alias: &str) -> Option<String> {
        self.load().store.get(alias).cloned()
    }

    fn current_path(&self) -> Option<String> {
        let context = self.load();
        context
            .current
            .as_ref()
            .and_then(|alias| context.store.get(alias).cloned())
    }
}

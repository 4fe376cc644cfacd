use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::context::AliasStore;
use crate::error::{GovernanceError, Lookup, Result};
use crate::http_client::{AsyncHttpClient, HttpClientConfig};
use crate::reference::{ClassifiedReference, ReferenceKind, classify_in};

/// Files tried, in order, when no reference and no current context are available
pub const CONVENTIONAL_FILENAMES: [&str; 3] = ["spec.json", "spec.yml", "spec.yaml"];

/// Where the text of a loaded document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    LocalFile,
    RemoteUrl,
    /// Submitted directly, e.g. in an HTTP request body
    Inline,
}

/// Document text plus the label every message about it uses
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub text: String,
    /// Resolved file path or URL, never the alias the user typed
    pub source_label: String,
    pub source_kind: SourceKind,
}

impl LoadedDocument {
    pub fn inline(text: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_label: source_label.into(),
            source_kind: SourceKind::Inline,
        }
    }
}

/// Caller-forced interpretation of a reference, bypassing classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitKind {
    File,
    Url,
    Context,
}

/// Turns a reference string into document text
pub struct DocumentLoader {
    aliases: Arc<dyn AliasStore>,
    http: HttpClientConfig,
    working_dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(aliases: Arc<dyn AliasStore>, http: HttpClientConfig) -> Self {
        Self {
            aliases,
            http,
            working_dir: PathBuf::new(),
        }
    }

    /// Resolve relative paths and conventional filenames against `dir`
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub async fn load(
        &self,
        reference: Option<&str>,
        explicit: Option<ExplicitKind>,
    ) -> Result<LoadedDocument> {
        let reference = match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => reference,
            None => return self.load_default().await,
        };

        let classified = match explicit {
            Some(ExplicitKind::File) => ClassifiedReference {
                kind: ReferenceKind::LocalPath,
                target: reference.to_string(),
                proxy_url: None,
            },
            Some(ExplicitKind::Url) => {
                let (target, proxy_url) = match reference.split_once('+') {
                    Some((target, proxy)) => (target, Some(proxy.to_string())),
                    None => (reference, None),
                };
                ClassifiedReference {
                    kind: ReferenceKind::RemoteUrl,
                    target: target.to_string(),
                    proxy_url,
                }
            }
            Some(ExplicitKind::Context) => ClassifiedReference {
                kind: ReferenceKind::Alias,
                target: reference.to_string(),
                proxy_url: None,
            },
            None => classify_in(reference, &self.working_dir),
        };
        tracing::debug!(reference, kind = ?classified.kind, "loading document");

        match classified.kind {
            ReferenceKind::LocalPath => self.load_file(Path::new(&classified.target)).await,
            ReferenceKind::Alias => self.load_alias(&classified.target).await,
            ReferenceKind::RemoteUrl => {
                self.load_url(&classified.target, classified.proxy_url.as_deref())
                    .await
            }
        }
    }

    /// Current context, then the first conventional file present
    async fn load_default(&self) -> Result<LoadedDocument> {
        if let Some(path) = self.aliases.current_path() {
            match self.load_file(Path::new(&path)).await {
                Ok(document) => return Ok(document),
                Err(e) => tracing::debug!(error = %e, "current context could not be loaded"),
            }
        }

        for name in CONVENTIONAL_FILENAMES {
            let path = self.working_dir.join(name);
            if path.is_file() {
                return self.load_file(&path).await;
            }
        }

        Err(GovernanceError::not_found(Lookup::Context, ""))
    }

    async fn load_alias(&self, alias: &str) -> Result<LoadedDocument> {
        let path = self
            .aliases
            .get_path(alias)
            .ok_or_else(|| GovernanceError::not_found(Lookup::Alias, alias))?;
        self.load_file(Path::new(&path)).await
    }

    async fn load_file(&self, path: &Path) -> Result<LoadedDocument> {
        let resolved = self.working_dir.join(path);
        let label = resolved.display().to_string();
        let text = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|_| GovernanceError::not_found(Lookup::File, label.clone()))?;

        Ok(LoadedDocument {
            text,
            source_label: label,
            source_kind: SourceKind::LocalFile,
        })
    }

    async fn load_url(&self, target: &str, proxy_url: Option<&str>) -> Result<LoadedDocument> {
        let url = Url::parse(target).map_err(|e| GovernanceError::InvalidUrl {
            url: target.to_string(),
            details: e.to_string(),
        })?;

        let client = match proxy_url {
            Some(proxy) => AsyncHttpClient::with_proxy(&self.http, proxy)?,
            None => AsyncHttpClient::new(&self.http)?,
        };
        let text = client.get_text(url.as_str()).await?;

        Ok(LoadedDocument {
            text,
            source_label: target.to_string(),
            source_kind: SourceKind::RemoteUrl,
        })
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::Value;
use url::Url;

use super::rules::Finding;
use super::{FormatParser, Resolver, parse_text};

/// Nesting limit for documents pulled in through external refs
pub(crate) const MAX_REF_DEPTH: usize = 16;

/// Where a document came from, used as the base for its relative refs
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BaseLocation {
    Url(Url),
    File(PathBuf),
    Unknown,
}

impl BaseLocation {
    pub(crate) fn from_source(source: &str) -> Self {
        if source.is_empty() {
            return BaseLocation::Unknown;
        }
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => BaseLocation::Url(url),
            _ => BaseLocation::File(PathBuf::from(source)),
        }
    }

    fn join(&self, reference: &str) -> Option<String> {
        if Url::parse(reference).is_ok() {
            return Some(reference.to_string());
        }
        match self {
            BaseLocation::Url(base) => base.join(reference).ok().map(|url| url.to_string()),
            BaseLocation::File(path) => Some(
                path.parent()
                    .unwrap_or(Path::new(""))
                    .join(reference)
                    .display()
                    .to_string(),
            ),
            BaseLocation::Unknown => Some(reference.to_string()),
        }
    }
}

/// Every `$ref` string in the tree with the path of the object holding it
fn collect_refs(value: &Value) -> Vec<(Vec<String>, String)> {
    fn walk(value: &Value, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, String)>) {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    out.push((path.clone(), reference.to_string()));
                    return;
                }
                for (key, child) in map {
                    path.push(key.clone());
                    walk(child, path, out);
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    path.push(index.to_string());
                    walk(child, path, out);
                    path.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk(value, &mut Vec::new(), &mut out);
    out
}

fn to_pointer(path: &[String]) -> String {
    path.iter()
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

fn split_fragment(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((location, fragment)) => (location, Some(fragment)),
        None => (reference, None),
    }
}

/// Inlines external refs through the registered resolvers
pub(crate) struct RefWalker<'a> {
    pub(crate) resolvers: &'a [Arc<dyn Resolver>],
    pub(crate) formats: &'a [Arc<dyn FormatParser>],
    pub(crate) cache: Option<&'a Mutex<HashMap<String, String>>>,
}

impl<'a> RefWalker<'a> {
    /// Resolve refs in `document`, pushing one finding per broken ref.
    ///
    /// Findings inside nested documents are reported at `origin`, the path of
    /// the ref in the top-level document that pulled them in.
    pub(crate) fn resolve<'b>(
        &'b self,
        document: &'b mut Value,
        base: BaseLocation,
        origin: Option<Vec<String>>,
        visited: Vec<String>,
        findings: &'b mut Vec<Finding>,
    ) -> BoxFuture<'b, ()> {
        Box::pin(async move {
            for (path, reference) in collect_refs(document) {
                let report_path = origin.clone().unwrap_or_else(|| path.clone());
                let broken = |message: String| Finding {
                    path: report_path.clone(),
                    message: format!("Could not resolve '{}': {}", reference, message),
                };

                if let Some(fragment) = reference.strip_prefix('#') {
                    if document.pointer(fragment).is_none() {
                        findings.push(broken("target does not exist in this document".into()));
                    }
                    continue;
                }

                let (location, fragment) = split_fragment(&reference);
                let Some(uri) = base.join(location) else {
                    findings.push(broken("cannot build an absolute location".into()));
                    continue;
                };
                // Circular or runaway chains stay as plain refs.
                if visited.contains(&uri) || visited.len() >= MAX_REF_DEPTH {
                    continue;
                }

                let text = match self.fetch(&uri).await {
                    Ok(text) => text,
                    Err(message) => {
                        findings.push(broken(message));
                        continue;
                    }
                };
                let mut target = match parse_text(self.formats, &text) {
                    Ok(value) => value,
                    Err(message) => {
                        findings.push(broken(message));
                        continue;
                    }
                };

                let mut nested_visited = visited.clone();
                nested_visited.push(uri.clone());
                self.resolve(
                    &mut target,
                    BaseLocation::from_source(&uri),
                    Some(report_path.clone()),
                    nested_visited,
                    findings,
                )
                .await;

                if let Some(fragment) = fragment.filter(|fragment| !fragment.is_empty()) {
                    match target.pointer(fragment) {
                        Some(value) => target = value.clone(),
                        None => {
                            findings.push(broken(format!("'#{}' not found in {}", fragment, uri)));
                            continue;
                        }
                    }
                }

                if let Some(slot) = document.pointer_mut(&to_pointer(&path)) {
                    *slot = target;
                }
            }
        })
    }

    async fn fetch(&self, uri: &str) -> Result<String, String> {
        if let Some(cache) = self.cache {
            let cached = cache
                .lock()
                .ok()
                .and_then(|entries| entries.get(uri).cloned());
            if let Some(text) = cached {
                return Ok(text);
            }
        }

        let resolver = self
            .resolvers
            .iter()
            .find(|resolver| resolver.can_read(uri))
            .ok_or_else(|| format!("no resolver can read {}", uri))?;
        tracing::debug!(resolver = resolver.name(), uri, "resolving reference");
        let text = resolver.read(uri).await.map_err(|e| e.to_string())?;

        if let Some(cache) = self.cache
            && let Ok(mut entries) = cache.lock()
        {
            entries.insert(uri.to_string(), text.clone());
        }
        Ok(text)
    }
}

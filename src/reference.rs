use std::path::Path;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Alias,
    LocalPath,
    RemoteUrl,
}

/// A user-supplied reference after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedReference {
    pub kind: ReferenceKind,
    pub target: String,
    /// Text after the first `+` of a remote reference, not yet validated
    pub proxy_url: Option<String>,
}

impl ClassifiedReference {
    fn new(kind: ReferenceKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            proxy_url: None,
        }
    }
}

/// Classify relative to the current working directory
pub fn classify(input: &str) -> ClassifiedReference {
    classify_in(input, Path::new(""))
}

/// Classify `input`, resolving relative paths against `base_dir`.
///
/// Never fails: anything that is not a dot-path, an existing regular file or an
/// http(s) URL is an alias, and a missing alias is reported when loading.
pub fn classify_in(input: &str, base_dir: &Path) -> ClassifiedReference {
    if input.starts_with('.') {
        return ClassifiedReference::new(ReferenceKind::LocalPath, input);
    }

    let is_file = std::fs::metadata(base_dir.join(input))
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if is_file {
        return ClassifiedReference::new(ReferenceKind::LocalPath, input);
    }

    let (target, proxy_url) = match input.split_once('+') {
        Some((target, proxy)) => (target, Some(proxy)),
        None => (input, None),
    };
    match Url::parse(target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => ClassifiedReference {
            kind: ReferenceKind::RemoteUrl,
            target: target.to_string(),
            proxy_url: proxy_url.map(str::to_string),
        },
        _ => ClassifiedReference::new(ReferenceKind::Alias, input),
    }
}

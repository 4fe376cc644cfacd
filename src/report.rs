use std::path::Path;

use crate::engine::Diagnostic;
use crate::error::{GovernanceError, Result};
use crate::output::DiagnosticsFormat;
use crate::validator::VerdictStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLevel {
    Success,
    Warning,
    Error,
}

/// One-line outcome shown after every validation, whatever the format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceSummary {
    pub level: SummaryLevel,
    pub message: String,
}

pub fn governance_summary(
    source_label: &str,
    diagnostics: &[Diagnostic],
    status: VerdictStatus,
) -> GovernanceSummary {
    match (status, diagnostics.is_empty()) {
        (VerdictStatus::Invalid, _) => GovernanceSummary {
            level: SummaryLevel::Error,
            message: format!("{} has governance issues", source_label),
        },
        (VerdictStatus::Valid, true) => GovernanceSummary {
            level: SummaryLevel::Success,
            message: format!(
                "{} is valid! You don't have governance issues.",
                source_label
            ),
        },
        (VerdictStatus::Valid, false) => GovernanceSummary {
            level: SummaryLevel::Warning,
            message: format!("{} is valid, but it has governance issues", source_label),
        },
    }
}

/// Check that `path` carries the extension `format` is saved under
pub fn check_output_path(path: &Path, format: DiagnosticsFormat) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let known = DiagnosticsFormat::ALL
        .iter()
        .any(|candidate| candidate.extension() == extension);
    if !known {
        return Err(GovernanceError::InvalidOutputFormat {
            path: path.to_path_buf(),
            extension,
        });
    }

    if extension != format.extension() {
        return Err(GovernanceError::InvalidOutputExtension {
            path: path.to_path_buf(),
            expected: format.extension().to_string(),
            format: format.name().to_string(),
        });
    }
    Ok(())
}

/// Write rendered diagnostics to `path`.
///
/// A path whose extension does not fit `format` is refused before anything is
/// written; the error is non-fatal and the caller reports it as a warning.
pub async fn save(path: &Path, format: DiagnosticsFormat, rendered: &str) -> Result<()> {
    if let Err(e) = check_output_path(path, format) {
        tracing::warn!(path = %path.display(), error = %e, "skipping report write");
        return Err(e);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, rendered).await?;
    tracing::debug!(path = %path.display(), format = format.name(), "report written");
    Ok(())
}

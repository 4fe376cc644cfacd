use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Ranked importance of a diagnostic; lower rank is more severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    /// Every severity, most severe first
    pub const ALL: [Severity; 4] = [
        Severity::Error,
        Severity::Warning,
        Severity::Information,
        Severity::Hint,
    ];

    pub fn rank(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Information => 2,
            Severity::Hint => 3,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(rank as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Hint => "hint",
        }
    }

    /// True when a diagnostic of this severity trips the given threshold
    pub fn fails(self, threshold: Severity) -> bool {
        self.rank() <= threshold.rank()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warning),
            "info" | "information" => Ok(Severity::Information),
            "hint" => Ok(Severity::Hint),
            other => Err(format!(
                "unknown severity '{}': expected error, warn, info or hint",
                other
            )),
        }
    }
}

// Diagnostics carry the numeric rank on the wire.
impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.rank())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rank = u8::deserialize(deserializer)?;
        Severity::from_rank(rank)
            .ok_or_else(|| de::Error::custom(format!("severity rank {} out of range", rank)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// One rule violation or informational finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub path: Vec<String>,
    pub severity: Severity,
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(code: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: Vec::new(),
            severity,
            range: Range::default(),
            source: None,
        }
    }

    pub fn at(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    /// Dotted rendering of the path, as shown by the text formatters
    pub fn path_display(&self) -> String {
        self.path.join(".")
    }
}

/// Best-effort location of a path inside the source text.
///
/// Walks the lines looking for each path segment as a YAML key or a quoted
/// JSON key, each one below the previous match. Stops at the first segment it
/// cannot find.
pub fn locate(text: &str, path: &[String]) -> Range {
    let lines: Vec<&str> = text.lines().collect();
    let mut found: Option<usize> = None;
    let mut from = 0;

    for segment in path {
        let yaml_key = format!("{}:", segment);
        let json_key = format!("\"{}\"", segment);
        let quoted_yaml_key = format!("'{}':", segment);
        let hit = lines.iter().enumerate().skip(from).find(|(_, line)| {
            let trimmed = line.trim_start().trim_start_matches("- ");
            trimmed.starts_with(&yaml_key)
                || trimmed.starts_with(&json_key)
                || trimmed.starts_with(&quoted_yaml_key)
        });
        match hit {
            Some((index, _)) => {
                found = Some(index);
                from = index + 1;
            }
            None => break,
        }
    }

    match found {
        Some(index) => {
            let line = lines[index];
            let indent = line.len() - line.trim_start().len();
            Range {
                start: Position {
                    line: index as u32,
                    character: indent as u32,
                },
                end: Position {
                    line: index as u32,
                    character: line.len() as u32,
                },
            }
        }
        None => Range::default(),
    }
}

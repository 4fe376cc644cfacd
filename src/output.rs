//! Diagnostics rendering
//!
//! `stylish` is grouped by severity under coloured headings; the other formats
//! follow the usual shapes of their namesakes. Colours are only emitted when
//! writing to a terminal.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::cli::VerbosityLevel;
use crate::engine::{Diagnostic, Severity, rules};
use crate::report::{GovernanceSummary, SummaryLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsFormat {
    Stylish,
    Json,
    Junit,
    Html,
    Text,
    Teamcity,
    Pretty,
}

impl DiagnosticsFormat {
    pub const ALL: [DiagnosticsFormat; 7] = [
        DiagnosticsFormat::Stylish,
        DiagnosticsFormat::Json,
        DiagnosticsFormat::Junit,
        DiagnosticsFormat::Html,
        DiagnosticsFormat::Text,
        DiagnosticsFormat::Teamcity,
        DiagnosticsFormat::Pretty,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DiagnosticsFormat::Stylish => "stylish",
            DiagnosticsFormat::Json => "json",
            DiagnosticsFormat::Junit => "junit",
            DiagnosticsFormat::Html => "html",
            DiagnosticsFormat::Text => "text",
            DiagnosticsFormat::Teamcity => "teamcity",
            DiagnosticsFormat::Pretty => "pretty",
        }
    }

    /// File extension a saved report in this format must carry
    pub fn extension(self) -> &'static str {
        match self {
            DiagnosticsFormat::Json => "json",
            DiagnosticsFormat::Junit => "xml",
            DiagnosticsFormat::Html => "html",
            DiagnosticsFormat::Stylish
            | DiagnosticsFormat::Text
            | DiagnosticsFormat::Teamcity
            | DiagnosticsFormat::Pretty => "txt",
        }
    }

    /// Unknown names fall back to `stylish`
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::debug!(format = name, "unknown diagnostics format, using stylish");
            DiagnosticsFormat::Stylish
        })
    }
}

impl FromStr for DiagnosticsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.name() == name)
            .ok_or_else(|| format!("unknown diagnostics format '{}'", s))
    }
}

/// Render without colours, as written to files and HTTP responses
pub fn format(
    diagnostics: &[Diagnostic],
    format: DiagnosticsFormat,
    fail_severity: Severity,
) -> String {
    Output::plain().format(diagnostics, format, fail_severity)
}

/// Output formatter for diagnostics and summaries
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn plain() -> Self {
        Self {
            verbosity: VerbosityLevel::Normal,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn severity_color(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Information => "34",
            Severity::Hint => "37",
        }
    }

    pub fn format(
        &self,
        diagnostics: &[Diagnostic],
        format: DiagnosticsFormat,
        fail_severity: Severity,
    ) -> String {
        match format {
            DiagnosticsFormat::Stylish => self.format_stylish(diagnostics, fail_severity),
            DiagnosticsFormat::Json => format_json(diagnostics),
            DiagnosticsFormat::Junit => format_junit(diagnostics, fail_severity),
            DiagnosticsFormat::Html => format_html(diagnostics),
            DiagnosticsFormat::Text => format_text(diagnostics),
            DiagnosticsFormat::Teamcity => format_teamcity(diagnostics),
            DiagnosticsFormat::Pretty => self.format_pretty(diagnostics, fail_severity),
        }
    }

    pub fn format_summary(&self, summary: &GovernanceSummary) -> String {
        let color = match summary.level {
            SummaryLevel::Success => "32",
            SummaryLevel::Warning => "33",
            SummaryLevel::Error => "31",
        };
        self.colorize(&summary.message, color)
    }

    /// Diagnostics grouped by severity, most severe first, empty groups omitted
    fn format_stylish(&self, diagnostics: &[Diagnostic], fail_severity: Severity) -> String {
        if diagnostics.is_empty() {
            return no_results(fail_severity);
        }

        let mut output = String::new();
        for severity in Severity::ALL {
            let group: Vec<&Diagnostic> = diagnostics
                .iter()
                .filter(|d| d.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }

            let heading = capitalize(severity.label());
            let color = format!("1;{}", Self::severity_color(severity));
            let _ = writeln!(output, "{}", self.colorize(&heading, &color));
            output.push_str(&self.format_group(&group));
            output.push('\n');
        }
        output.push_str(&self.problem_count(diagnostics));
        output
    }

    /// One line per diagnostic, in the order given; verbose output adds the
    /// rule description underneath
    fn format_group(&self, group: &[&Diagnostic]) -> String {
        let mut output = String::new();
        for diagnostic in group {
            let _ = writeln!(
                output,
                "  {}  {}  {}  {}{}",
                position(diagnostic),
                self.colorize(
                    diagnostic.severity.label(),
                    Self::severity_color(diagnostic.severity)
                ),
                diagnostic.code,
                diagnostic.message,
                path_suffix(diagnostic),
            );
            if self.verbosity == VerbosityLevel::Verbose {
                if let Some(description) = rules::describe(&diagnostic.code) {
                    let _ = writeln!(output, "      {}", description);
                }
            }
        }
        output
    }

    fn format_pretty(&self, diagnostics: &[Diagnostic], fail_severity: Severity) -> String {
        if diagnostics.is_empty() {
            return no_results(fail_severity);
        }

        let mut output = String::new();
        for (source, group) in by_source(diagnostics) {
            let _ = writeln!(output, "{}", self.colorize(source, "4"));
            let width = group.iter().map(|d| position(d).len()).max().unwrap_or(0);
            for diagnostic in group {
                let _ = writeln!(
                    output,
                    " {:>width$}  {:<11}  {:<24}  {}{}",
                    position(diagnostic),
                    self.colorize(
                        diagnostic.severity.label(),
                        Self::severity_color(diagnostic.severity)
                    ),
                    diagnostic.code,
                    diagnostic.message,
                    path_suffix(diagnostic),
                    width = width,
                );
            }
            output.push('\n');
        }
        output.push_str(&self.problem_count(diagnostics));
        output
    }

    fn problem_count(&self, diagnostics: &[Diagnostic]) -> String {
        let count = |severity| diagnostics.iter().filter(|d| d.severity == severity).count();
        let line = format!(
            "✖ {} problem{} ({} error{}, {} warning{}, {} info{}, {} hint{})\n",
            diagnostics.len(),
            plural(diagnostics.len()),
            count(Severity::Error),
            plural(count(Severity::Error)),
            count(Severity::Warning),
            plural(count(Severity::Warning)),
            count(Severity::Information),
            plural(count(Severity::Information)),
            count(Severity::Hint),
            plural(count(Severity::Hint)),
        );
        let color = if count(Severity::Error) > 0 { "1;31" } else { "1;33" };
        self.colorize(&line, color)
    }
}

fn no_results(fail_severity: Severity) -> String {
    format!(
        "No results with a severity of '{}' or higher found!\n",
        fail_severity.label()
    )
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 1-based `line:character`
fn position(diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{}",
        diagnostic.range.start.line + 1,
        diagnostic.range.start.character + 1
    )
}

fn path_suffix(diagnostic: &Diagnostic) -> String {
    if diagnostic.path.is_empty() {
        String::new()
    } else {
        format!("  {}", diagnostic.path_display())
    }
}

fn source_of(diagnostic: &Diagnostic) -> &str {
    diagnostic.source.as_deref().unwrap_or("<input>")
}

fn by_source(diagnostics: &[Diagnostic]) -> BTreeMap<&str, Vec<&Diagnostic>> {
    let mut groups: BTreeMap<&str, Vec<&Diagnostic>> = BTreeMap::new();
    for diagnostic in diagnostics {
        groups.entry(source_of(diagnostic)).or_default().push(diagnostic);
    }
    groups
}

fn format_json(diagnostics: &[Diagnostic]) -> String {
    serde_json::to_string_pretty(diagnostics).unwrap_or_else(|_| "[]".to_string())
}

fn format_text(diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    for diagnostic in diagnostics {
        let _ = writeln!(
            output,
            "{}:{} {} {} \"{}\"",
            source_of(diagnostic),
            position(diagnostic),
            diagnostic.severity.label(),
            diagnostic.code,
            diagnostic.message,
        );
    }
    output
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// One test case per failing diagnostic; diagnostics below the threshold are left out
fn format_junit(diagnostics: &[Diagnostic], fail_severity: Severity) -> String {
    let failing: Vec<Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.severity.fails(fail_severity))
        .cloned()
        .collect();

    let mut output = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<testsuites>\n");
    for (source, group) in by_source(&failing) {
        let source = xml_escape(source);
        let _ = writeln!(
            output,
            "<testsuite package=\"govlint\" time=\"0\" tests=\"{}\" errors=\"0\" failures=\"{}\" name=\"{}\">",
            group.len(),
            group.len(),
            source
        );
        for diagnostic in group {
            let _ = writeln!(
                output,
                "<testcase time=\"0\" name=\"{}#{}\" classname=\"{}\"><failure message=\"{}\"><![CDATA[line {}, col {}, {} - {} ({})]]></failure></testcase>",
                source,
                xml_escape(&diagnostic.code),
                source,
                xml_escape(&diagnostic.message),
                diagnostic.range.start.line + 1,
                diagnostic.range.start.character + 1,
                capitalize(diagnostic.severity.label()),
                diagnostic.message.replace("]]>", "]]]]><![CDATA[>"),
                diagnostic.code,
            );
        }
        output.push_str("</testsuite>\n");
    }
    output.push_str("</testsuites>\n");
    output
}

fn format_html(diagnostics: &[Diagnostic]) -> String {
    let mut rows = String::new();
    for diagnostic in diagnostics {
        let _ = writeln!(
            rows,
            "<tr class=\"severity-{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            diagnostic.severity.label(),
            xml_escape(source_of(diagnostic)),
            position(diagnostic),
            diagnostic.severity.label(),
            xml_escape(&diagnostic.code),
            xml_escape(&diagnostic.message),
            xml_escape(&diagnostic.path_display()),
        );
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>govlint report</title></head>\n<body>\n<h1>{} problem{}</h1>\n<table>\n<tr><th>Source</th><th>Position</th><th>Severity</th><th>Rule</th><th>Message</th><th>Path</th></tr>\n{}</table>\n</body>\n</html>\n",
        diagnostics.len(),
        plural(diagnostics.len()),
        rows
    )
}

fn teamcity_escape(text: &str) -> String {
    text.replace('|', "||")
        .replace('\'', "|'")
        .replace('\n', "|n")
        .replace('\r', "|r")
        .replace('[', "|[")
        .replace(']', "|]")
}

fn format_teamcity(diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    for diagnostic in diagnostics {
        let code = teamcity_escape(&diagnostic.code);
        let message = teamcity_escape(&diagnostic.message);
        let severity = match diagnostic.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Information => "INFO",
            Severity::Hint => "WEAK WARNING",
        };
        let _ = writeln!(
            output,
            "##teamcity[inspectionType category='openapi' id='{code}' name='{code}' description='{message}']"
        );
        let _ = writeln!(
            output,
            "##teamcity[inspection typeId='{code}' file='{}' line='{}' message='{message}' SEVERITY='{severity}']",
            teamcity_escape(source_of(diagnostic)),
            diagnostic.range.start.line + 1,
        );
    }
    output
}

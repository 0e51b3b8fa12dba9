//! Human-readable diagnostics.
//!
//! Resolution failures are structured data first ([`Report`]); this module
//! turns them into terminal text: a headline, context lines and numbered
//! suggestions.

use std::fmt;
use std::path::PathBuf;

use crate::resolver::Report;

/// Common suggestion messages.
pub mod suggestions {
    /// Suggestion when a catalog declares nothing under the requested tag.
    pub const UNKNOWN_TAG: &str = "help: Run `fp entries <catalog> --tag <tag>` to list declared candidates";

    /// Suggestion when no candidate matches.
    pub const NO_MATCH: &str = "help: Run `fp attrmap <catalog> --tag <tag>` to see which attributes candidates accept";

    /// Suggestion when a catalog fails to register.
    pub const BAD_CATALOG: &str = "help: Check the `[[candidate]]` tables of the catalog";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Catalog file the diagnostic is about
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
            }
        };
        output.push_str(&format!("{}: {}\n", severity, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            output.push_str(&format!("{}: consider:\n", help));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

/// Render a full resolution report: ranking first, then rejections.
pub fn render_report(report: &Report) -> String {
    let mut out = format!("resolution of `{}`\n", report.tag);
    if report.description.is_empty() {
        out.push_str("  description: (empty)\n");
    } else {
        let given: Vec<_> = report
            .description
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        out.push_str(&format!("  description: {}\n", given.join(" ")));
    }

    for (i, r) in report.ranked.iter().enumerate() {
        out.push_str(&format!(
            "  no.{} {} (priority {}, {} attributes)\n",
            i + 1,
            r.candidate,
            r.priority,
            r.score
        ));
    }

    for c in &report.rejected {
        out.push_str(&format!("  x {}\n", c.candidate));
        for reason in c.reasons() {
            out.push_str(&format!("      {}\n", reason));
        }
    }
    out
}

use core::fmt;

use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Debug => "debug",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Collects the events of one compile.
///
/// Every report is mirrored to `tracing`. Only errors decide whether a compile
/// succeeds; warnings are counted and debug events are informational.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.errors += 1;
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message,
        });
    }

    pub fn report_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings += 1;
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    pub fn report_debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{}", message);
        self.entries.push(Diagnostic {
            severity: Severity::Debug,
            message,
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Entries at or above the given severity.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity >= severity)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.errors = 0;
        self.warnings = 0;
    }

    /// Renders warnings and errors one per line, followed by a summary line.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();
        for diagnostic in self.at_least(Severity::Warning) {
            let label = diagnostic.severity.to_string();
            let label = match (color, diagnostic.severity) {
                (false, _) => label,
                (true, Severity::Error) => label.red().bold().to_string(),
                (true, Severity::Warning) => label.yellow().bold().to_string(),
                (true, Severity::Debug) => label.dimmed().to_string(),
            };
            out.push_str(&format!("{label}: {}\n", diagnostic.message));
        }
        out.push_str(&format!(
            "{} error(s), {} warning(s)\n",
            self.errors, self.warnings
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report_debug("lowering started");
        diagnostics.report_warning("unused label \"x\"");
        diagnostics.report_error("undefined label \"y\"");
        diagnostics.report_error("duplicate label \"z\"");

        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.entries().len(), 4);
        assert_eq!(diagnostics.at_least(Severity::Warning).count(), 3);
    }

    #[test]
    fn reset_clears_everything() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report_error("boom");
        diagnostics.reset();
        assert_eq!(diagnostics.error_count(), 0);
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn render_skips_debug() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report_debug("quiet");
        diagnostics.report_error("loud");
        let rendered = diagnostics.render(false);
        assert_eq!(rendered, "error: loud\n1 error(s), 0 warning(s)\n");
    }
}

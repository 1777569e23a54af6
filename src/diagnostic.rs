//! Scanner diagnostics.
//!
//! The engine raises exactly two kinds of diagnostic, both pointing at a
//! single character of the source: a strict-mode stall (fatal) and a
//! non-strict recovery (the scanner skipped one character and went on).
//! Scanner-state snapshot lines ride along as detail notes.

use crate::span::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// The character the scanner was looking at.
    pub span: Span,
    /// Scanner-state lines (mode stack, upcoming source, ...).
    pub details: Vec<String>,
}

impl Diagnostic {
    /// A strict-mode stall: the scanner could not advance.
    pub fn stall(message: String, span: Span, details: Vec<String>) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            details,
        }
    }

    /// A non-strict recovery: one character was skipped as markup.
    pub fn recovery(message: String, span: Span, details: Vec<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            details,
        }
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let (kind, color, label) = match self.severity {
            Severity::Error => (
                ReportKind::Error,
                Color::Red,
                "the scanner could not advance past this character",
            ),
            Severity::Warning => (
                ReportKind::Warning,
                Color::Yellow,
                "skipped this character and continued",
            ),
        };

        let mut report = Report::build(kind, filename, self.span.start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start..self.span.end))
                    .with_message(label)
                    .with_color(color),
            );

        for detail in &self.details {
            report = report.with_note(detail);
        }

        // every stall has the same remedy
        if self.severity == Severity::Error {
            report =
                report.with_help("re-run without strict mode to skip the offending character");
        }

        report
            .finish()
            .eprint((filename, Source::from(source)))
            .unwrap();
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diagnostic in diagnostics {
        diagnostic.render(filename, source);
    }
}

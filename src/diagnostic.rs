use std::fmt;

use crate::lower::Construct;
use crate::span::Span;

/// What failed. Every fatal diagnostic carries exactly one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed numeric literal, unterminated literal or comment, out-of-buffer read.
    Scan,
    /// The token stream does not form a tree.
    Parse,
    /// A construct the target grammar cannot express.
    IllegalConstruct(Construct),
    /// A function declared with more than one receiver binding.
    MultiReceiver,
    /// A result declared with a pointer type.
    PointerResult,
    /// A type annotation was required but the resolver had no answer.
    TypeResolution,
    /// Unreadable or malformed configuration file.
    Config,
    /// Non-fatal note attached to a successful lowering.
    Lint,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Scan => write!(f, "scan error"),
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::IllegalConstruct(c) => write!(f, "illegal construct ({})", c.name()),
            ErrorKind::MultiReceiver => write!(f, "multiple receivers"),
            ErrorKind::PointerResult => write!(f, "pointer result"),
            ErrorKind::TypeResolution => write!(f, "type resolution error"),
            ErrorKind::Config => write!(f, "configuration error"),
            ErrorKind::Lint => write!(f, "lint"),
        }
    }
}

/// A transpiler diagnostic (error or warning).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            kind: ErrorKind::Lint,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn report<'a>(&self, filename: &'a str) -> ariadne::Report<'a, (&'a str, std::ops::Range<usize>)> {
        use ariadne::{Color, Label, Report, ReportKind};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(format!("{}: {}", self.kind, self.message))
            .with_label(
                Label::new((filename, self.span.range()))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::Source;

        if let Err(err) = self
            .report(filename)
            .eprint((filename, Source::from(source)))
        {
            eprintln!("{}: {} ({})", filename, self.message, err);
        }
    }

    /// Render the diagnostic into a plain string (no colors on a non-tty writer).
    pub fn render_to_string(&self, filename: &str, source: &str) -> String {
        use ariadne::Source;

        let mut out = Vec::new();
        if self
            .report(filename)
            .write((filename, Source::from(source)), &mut out)
            .is_err()
        {
            return format!("{}: {}", self.kind, self.message);
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.kind, self.span.start, self.span.end, self.message
        )
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(0, 10, 15);
        let d = Diagnostic::error(ErrorKind::Scan, "bad literal".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.kind, ErrorKind::Scan);
        assert_eq!(d.message, "bad literal");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
        assert!(d.is_error());
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("left untouched".to_string(), Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.kind, ErrorKind::Lint);
        assert!(!d.is_error());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::error(ErrorKind::PointerResult, "x".to_string(), Span::new(0, 0, 5))
            .with_note("note 1".to_string())
            .with_help("help text".to_string())
            .with_note("note 2".to_string());
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.help.as_deref(), Some("help text"));
    }

    #[test]
    fn test_kind_display_names_construct() {
        let kind = ErrorKind::IllegalConstruct(Construct::DeferredCall);
        assert_eq!(kind.to_string(), "illegal construct (defer statement)");
    }

    #[test]
    fn test_render_to_string_mentions_message() {
        let source = "func f() {\n    defer g()\n}\n";
        let d = Diagnostic::error(
            ErrorKind::IllegalConstruct(Construct::DeferredCall),
            "deferred calls are not supported".to_string(),
            Span::new(0, 15, 24),
        )
        .with_help("call g() explicitly before each return".to_string());
        let out = d.render_to_string("test.go", source);
        assert!(out.contains("deferred calls are not supported"), "{}", out);
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "x := 1i\n";
        let d = Diagnostic::error(ErrorKind::Scan, "imaginary literal".to_string(), Span::new(0, 5, 7));
        d.render("test.go", source);
        render_diagnostics(&[d], "test.go", source);
    }
}

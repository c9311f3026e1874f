//! Error reporting
//!
//! Recoverable problems in a script never abort a compile. They are turned into a
//! [Diagnostic] carrying the document, line and the compositor being built, and handed
//! to a [DiagnosticSink]. The rendered text follows the established engine log format:
//!
//!     Error in compositor <name> at line <n> of <document>: <message>
//!     Error at line <n> of <document>: <message>
//!     Error in compositor <name> : <message>      (anonymous document)

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Input matched no statement.
    SyntaxMismatch,
    /// A matched statement in a place it is not allowed.
    Misplaced,
    /// A value the builder or an action refused.
    DomainValue,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::SyntaxMismatch => write!(f, "syntax"),
            DiagnosticKind::Misplaced => write!(f, "misplaced"),
            DiagnosticKind::DomainValue => write!(f, "value"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub document: String,
    pub line: usize,
    pub compositor: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            document: String::new(),
            line,
            compositor: None,
            message: message.into(),
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = document.into();
        self
    }

    pub fn in_compositor(mut self, compositor: Option<&str>) -> Self {
        self.compositor = compositor.map(str::to_string);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.document.is_empty(), &self.compositor) {
            (true, Some(name)) => write!(f, "Error in compositor {} : {}", name, self.message),
            (true, None) => write!(f, "Error : {}", self.message),
            (false, Some(name)) => write!(
                f,
                "Error in compositor {} at line {} of {}: {}",
                name, self.line, self.document, self.message
            ),
            (false, None) => write!(
                f,
                "Error at line {} of {}: {}",
                self.line, self.document, self.message
            ),
        }
    }
}

/// Receiver of recoverable compile errors.
pub trait DiagnosticSink {
    fn log_message(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn log_message(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn log_message(&mut self, diagnostic: Diagnostic) {
        (**self).log_message(diagnostic);
    }
}

/// Forwards diagnostics to the `log` facade as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn log_message(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic() -> Diagnostic {
        Diagnostic::new(DiagnosticKind::SyntaxMismatch, 12, "unexpected 'foo'")
    }

    #[test]
    fn named_document_with_compositor() {
        let d = diagnostic()
            .with_document("bloom.compositor")
            .in_compositor(Some("Bloom"));
        assert_eq!(
            d.to_string(),
            "Error in compositor Bloom at line 12 of bloom.compositor: unexpected 'foo'"
        );
    }

    #[test]
    fn named_document_outside_compositor() {
        let d = diagnostic().with_document("bloom.compositor");
        assert_eq!(
            d.to_string(),
            "Error at line 12 of bloom.compositor: unexpected 'foo'"
        );
    }

    #[test]
    fn anonymous_document_drops_line() {
        let d = diagnostic().in_compositor(Some("Bloom"));
        assert_eq!(d.to_string(), "Error in compositor Bloom : unexpected 'foo'");
        assert_eq!(diagnostic().to_string(), "Error : unexpected 'foo'");
    }

    #[test]
    fn vec_collects() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.log_message(diagnostic());
        assert_eq!(sink.len(), 1);
    }
}

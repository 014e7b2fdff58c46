//! Collector for non-fatal conditions encountered while building the document.
//!
//! Components never abort on a recoverable problem. They degrade their output
//! (drop a field, skip a record) and record a [`Diagnostic`] here instead. The
//! collector is threaded through each call and handed back to the caller, who
//! decides how to report it.

use log::debug;
use std::fmt;

/// Category of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A traffic record, or part of one, could not be decoded
    MalformedSample,
    /// A JSON member whose value carries no shape was left out of a schema
    DroppedSchemaMember,
    /// A path under the document tree did not match any known fragment shape
    UnexpectedFragment,
    /// Two operations derived the same identifier; the later one was skipped
    IdentifierCollision,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::MalformedSample => "malformed sample",
            DiagnosticKind::DroppedSchemaMember => "dropped schema member",
            DiagnosticKind::UnexpectedFragment => "unexpected fragment",
            DiagnosticKind::IdentifierCollision => "identifier collision",
        };
        f.write_str(label)
    }
}

/// A single recorded condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Ordered list of diagnostics gathered during one run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            message: message.into(),
        };
        debug!("Recorded diagnostic: {}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of diagnostics of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_count() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.push(DiagnosticKind::MalformedSample, "bad body");
        diagnostics.push(DiagnosticKind::DroppedSchemaMember, "$.user.name");
        diagnostics.push(DiagnosticKind::MalformedSample, "bad query");

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedSample), 2);
        assert_eq!(diagnostics.count(DiagnosticKind::UnexpectedFragment), 0);
        assert_eq!(diagnostics.entries()[1].message, "$.user.name");
    }

    #[test]
    fn test_display_includes_kind() {
        let diagnostic = Diagnostic {
            kind: DiagnosticKind::UnexpectedFragment,
            message: "paths/README.md".to_string(),
        };
        assert_eq!(
            diagnostic.to_string(),
            "unexpected fragment: paths/README.md"
        );
    }
}

use std::collections::HashSet;

use serde::Serialize;

use crate::ast::SourceSpan;

pub(crate) const TOOL_NAME: &str = "check(symbolic)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    /// `check(symbolic): <location>: <message>`, the text shown to users.
    pub located_message: String,
    pub level: DiagnosticLevel,
    pub span: Option<SourceSpan>,
    /// `<chunk>:<line>:<column>`, `None` for diagnostics without a position.
    pub location: Option<String>,
}

/// Diagnostics of one module check, deduplicated by located message.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    seen: HashSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error_with_span<S: Into<String>>(
        &mut self,
        message: S,
        span: Option<SourceSpan>,
        location: Option<String>,
    ) {
        self.push_entry(DiagnosticLevel::Error, message.into(), span, location);
    }

    pub fn push_warning_with_span<S: Into<String>>(
        &mut self,
        message: S,
        span: Option<SourceSpan>,
        location: Option<String>,
    ) {
        self.push_entry(DiagnosticLevel::Warning, message.into(), span, location);
    }

    fn push_entry(
        &mut self,
        level: DiagnosticLevel,
        message: String,
        span: Option<SourceSpan>,
        location: Option<String>,
    ) {
        let located_message =
            inox_support::located(TOOL_NAME, location.as_deref().unwrap_or(""), &message);
        self.push(Diagnostic {
            message,
            located_message,
            level,
            span,
            location,
        });
    }

    /// Returns false when an identical diagnostic was already reported.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if !self.seen.insert(diagnostic.located_message.clone()) {
            return false;
        }
        self.entries.push(diagnostic);
        true
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.entries {
            self.push(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Warning)
    }

    /// All located messages joined by newlines, as reported to command line users.
    pub fn report(&self) -> String {
        let mut report = String::new();
        for diagnostic in &self.entries {
            report.push_str(&diagnostic.located_message);
            report.push('\n');
        }
        report
    }
}

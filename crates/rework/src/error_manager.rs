//! Collects diagnostics reported by validators and contained handler errors.

use std::fmt;

use crate::ast::{Node, SourcePosition};
use crate::error::{Error, SubscriptionError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorLevel {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLevel::Warning => write!(f, "warning"),
            ErrorLevel::Error => write!(f, "error"),
            ErrorLevel::Fatal => write!(f, "fatal"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub position: Option<SourcePosition>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{} at {}: {}", self.level, position, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

/// Sink for problems found while processing a stylesheet.
pub trait ErrorManager {
    /// Report a problem with a specific unit.
    fn report(&mut self, level: ErrorLevel, unit: &Node, message: &str);

    /// Report an error raised by a handler and contained by the emitter.
    fn report_error(&mut self, error: Error);

    fn diagnostics(&self) -> &[Diagnostic];

    fn has_errors(&self) -> bool {
        self.diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.level >= ErrorLevel::Error)
    }

    fn has_warnings(&self) -> bool {
        self.diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.level == ErrorLevel::Warning)
    }

    /// One line per diagnostic, or `None` when nothing was reported.
    fn summarize(&self) -> Option<String> {
        let diagnostics = self.diagnostics();
        if diagnostics.is_empty() {
            return None;
        }
        Some(
            diagnostics
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

#[derive(Debug, Default)]
pub struct DefaultErrorManager {
    source_name: Option<String>,
    warnings_as_errors: bool,
    diagnostics: Vec<Diagnostic>,
}

impl DefaultErrorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn push(&mut self, mut level: ErrorLevel, position: Option<SourcePosition>, message: String) {
        if self.warnings_as_errors && level == ErrorLevel::Warning {
            level = ErrorLevel::Error;
        }
        let message = match &self.source_name {
            Some(name) => format!("{name}: {message}"),
            None => message,
        };
        log::warn!("{level}: {message}");
        self.diagnostics.push(Diagnostic {
            level,
            position,
            message,
        });
    }
}

impl ErrorManager for DefaultErrorManager {
    fn report(&mut self, level: ErrorLevel, unit: &Node, message: &str) {
        self.push(level, unit.position(), message.to_string());
    }

    fn report_error(&mut self, error: Error) {
        let (level, position) = match &error {
            Error::Parse(parse) => (ErrorLevel::Error, Some(parse.position)),
            Error::Subscription(SubscriptionError::Plugin(_)) => (ErrorLevel::Error, None),
            _ => (ErrorLevel::Fatal, None),
        };
        let message = match error {
            Error::Parse(parse) => parse.message.to_string(),
            other => other.to_string(),
        };
        self.push(level, position, message);
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, Syntax};
    use crate::error::{Message, ParserError};

    #[test]
    fn warnings_are_not_errors_by_default() {
        let mut ast = Ast::new();
        let rule = ast.create(Syntax::Rule, Some(SourcePosition::new(1, 1)));
        let mut errors = DefaultErrorManager::new();
        errors.report(ErrorLevel::Warning, &ast[rule], "empty rule");

        assert!(errors.has_warnings());
        assert!(!errors.has_errors());
        assert_eq!(
            errors.summarize().as_deref(),
            Some("warning at line 1, column 1: empty rule")
        );
    }

    #[test]
    fn warnings_as_errors_promotes() {
        let mut ast = Ast::new();
        let rule = ast.create(Syntax::Rule, None);
        let mut errors = DefaultErrorManager::new().warnings_as_errors(true);
        errors.report(ErrorLevel::Warning, &ast[rule], "empty rule");
        assert!(errors.has_errors());
    }

    #[test]
    fn parse_errors_keep_their_position() {
        let mut errors = DefaultErrorManager::new().source_name("input.css");
        errors.report_error(Error::Parse(ParserError::new(
            SourcePosition::new(2, 4),
            Message::ExpectedSelector,
        )));
        assert_eq!(
            errors.diagnostics()[0].to_string(),
            "error at line 2, column 4: input.css: expected a selector"
        );
    }
}

use std::fmt::{self, Display};

use crate::ast::Span;
use crate::coercion::CoercionError;
use crate::metadata::MetadataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    Parse,
    UnsupportedConstruct,
    TypeCoercion,
    AmbiguousReference,
    UnknownReference,
}

impl Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileErrorKind::Parse => "ParseError",
            CompileErrorKind::UnsupportedConstruct => "UnsupportedConstruct",
            CompileErrorKind::TypeCoercion => "TypeCoercionError",
            CompileErrorKind::AmbiguousReference => "AmbiguousReference",
            CompileErrorKind::UnknownReference => "UnknownReference",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub span: Option<Span>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, span: Option<Span>) -> Self {
        Self { kind, message: message.into(), span }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Parse, message, Some(span))
    }

    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::UnsupportedConstruct, message, Some(span))
    }

    pub fn ambiguous(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::AmbiguousReference, message, Some(span))
    }

    pub fn unknown(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::UnknownReference, message, Some(span))
    }

    pub fn from_coercion(error: CoercionError, span: Span) -> Self {
        let kind = match error {
            CoercionError::Invalid { .. } => CompileErrorKind::TypeCoercion,
            CoercionError::Unsupported { .. } => CompileErrorKind::UnsupportedConstruct,
        };
        Self::new(kind, error.to_string(), Some(span))
    }

    pub fn from_metadata(error: MetadataError, span: Span) -> Self {
        Self::new(CompileErrorKind::UnknownReference, error.to_string(), Some(span))
    }

    pub fn err<T>(self) -> Result<T, CompileError> {
        Err(self)
    }

    /// The source line holding the error with a caret run under the span.
    pub fn highlight(&self, sql: &str) -> Option<String> {
        let span = self.span?;
        if span.start > sql.len() || !sql.is_char_boundary(span.start) {
            return None;
        }
        let line_start = sql[..span.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = sql[span.start..].find('\n').map(|i| span.start + i).unwrap_or(sql.len());
        let line = sql[line_start..line_end].trim_end_matches('\r');

        let pad = sql[line_start..span.start].chars().count();
        let end = span.end.clamp(span.start, line_end);
        let width = sql.get(span.start..end).map(|s| s.chars().count()).unwrap_or(0).max(1);

        Some(format!("{}\n{}{}", line, " ".repeat(pad), "^".repeat(width)))
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, "\n  at [{}:{}]", span.start, span.end)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_span() {
        let e = CompileError::unsupported("HAVING is not supported", Span::new(40, 52));
        assert_eq!(e.to_string(), "UnsupportedConstruct: HAVING is not supported\n  at [40:52]");
    }

    #[test]
    fn highlight_points_at_the_span_on_its_line() {
        let sql = "SELECT name\nFROM account\nWHERE a.x = b.y";
        let start = sql.find("a.x").unwrap();
        let e = CompileError::unsupported("two columns", Span::new(start, start + 9));
        assert_eq!(e.highlight(sql).unwrap(), "WHERE a.x = b.y\n      ^^^^^^^^^");

        // spans running past the line stop at its end
        let e = CompileError::unsupported("x", Span::new(start, sql.len() + 4));
        assert_eq!(e.highlight(sql).unwrap(), "WHERE a.x = b.y\n      ^^^^^^^^^");
    }

    #[test]
    fn highlight_needs_a_span_inside_the_text() {
        let e = CompileError::new(CompileErrorKind::Parse, "x", None);
        assert!(e.highlight("SELECT 1").is_none());
        let e = CompileError::parse("x", Span::new(50, 60));
        assert!(e.highlight("SELECT 1").is_none());
    }

    #[test]
    fn coercion_failures_keep_their_category() {
        let invalid = CoercionError::invalid("revenue", "abc", "money");
        assert_eq!(CompileError::from_coercion(invalid, Span::new(0, 3)).kind, CompileErrorKind::TypeCoercion);
        let unsupported = CoercionError::unsupported("customerid", "polymorphic");
        assert_eq!(CompileError::from_coercion(unsupported, Span::new(0, 3)).kind, CompileErrorKind::UnsupportedConstruct);
    }
}

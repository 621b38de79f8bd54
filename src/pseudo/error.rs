use serde::Serialize;
use thiserror::Error;

use super::token::Span;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Illegal character '{character}'")]
    UnexpectedCharacter { character: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
}

/// A recoverable problem found while translating pseudocode.
///
/// Lexical and syntax problems are collected rather than raised so that one
/// translation reports every problem it can find.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{message} at line {}, column {}", span.line, span.column)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn lexical(error: LexError, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Lexical,
            message: error.to_string(),
            span,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Syntax,
            message: message.into(),
            span,
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Invalid dedent to column {indent_level} at line {line}")]
    InvalidDedent { indent_level: usize, line: usize },
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Invalid number literal '{literal}' at line {line}, column {column}")]
    InvalidNumberLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Unbalanced '{bracket}' at line {line}, column {column}")]
    UnbalancedBracket {
        bracket: char,
        line: usize,
        column: usize,
    },
}

pub type LexResult<T> = Result<T, LexError>;

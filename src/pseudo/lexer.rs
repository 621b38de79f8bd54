use std::{iter::Peekable, str::CharIndices};

use super::error::{Diagnostic, LexError};
use super::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    expect_operand: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 0,
            expect_operand: true,
            diagnostics: Vec::new(),
        }
    }

    /// Returns the next token, skipping (and recording) illegal characters.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            self.skip_whitespace();
            let &(start, ch) = self.chars.peek()?;
            let span = Span {
                line: self.line,
                column: self.column,
            };

            let kind = match ch {
                '<' => match self.peek_second() {
                    Some('-') => self.two_char(TokenKind::Assign),
                    Some('=') => self.two_char(TokenKind::Le),
                    _ => self.one_char(TokenKind::Lt),
                },
                '>' => match self.peek_second() {
                    Some('=') => self.two_char(TokenKind::Ge),
                    _ => self.one_char(TokenKind::Gt),
                },
                '=' => match self.peek_second() {
                    Some('=') => self.two_char(TokenKind::Eq),
                    _ => self.one_char(TokenKind::Eq),
                },
                '!' if self.peek_second() == Some('=') => self.two_char(TokenKind::NotEq),
                '/' => match self.peek_second() {
                    Some('/') => self.two_char(TokenKind::IntDivide),
                    _ => self.one_char(TokenKind::Divide),
                },
                '+' | '-'
                    if self.expect_operand
                        && self.peek_second().is_some_and(|c| c.is_ascii_digit()) =>
                {
                    self.advance_char();
                    self.read_digits();
                    TokenKind::Number
                }
                '+' => self.one_char(TokenKind::Plus),
                '-' => self.one_char(TokenKind::Minus),
                '*' => self.one_char(TokenKind::Times),
                '%' => self.one_char(TokenKind::Mod),
                '^' => self.one_char(TokenKind::Power),
                '(' => self.one_char(TokenKind::LParen),
                ')' => self.one_char(TokenKind::RParen),
                '[' => self.one_char(TokenKind::LBracket),
                ']' => self.one_char(TokenKind::RBracket),
                '{' => self.one_char(TokenKind::LBrace),
                '}' => self.one_char(TokenKind::RBrace),
                ',' => self.one_char(TokenKind::Comma),
                c if c.is_ascii_digit() => {
                    self.read_digits();
                    TokenKind::Number
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    self.read_identifier();
                    TokenKind::Name
                }
                character => {
                    self.advance_char();
                    tracing::debug!(%character, line = span.line, column = span.column, "skipping illegal character");
                    self.diagnostics.push(Diagnostic::lexical(
                        LexError::UnexpectedCharacter { character },
                        span,
                    ));
                    continue;
                }
            };

            let end = self.current_index();
            let input = self.input;
            let lexeme = &input[start..end];
            let kind = match kind {
                TokenKind::Name => TokenKind::keyword(lexeme).unwrap_or(TokenKind::Name),
                other => other,
            };
            self.expect_operand = !kind.ends_operand();
            return Some(Token::new(kind, lexeme, span));
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn one_char(&mut self, kind: TokenKind) -> TokenKind {
        self.advance_char();
        kind
    }

    fn two_char(&mut self, kind: TokenKind) -> TokenKind {
        self.advance_char();
        self.advance_char();
        kind
    }

    fn read_digits(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) {
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        // \u{8} is the backspace control character, which the notation treats as blank.
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '\u{8}' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn peek_second(&self) -> Option<char> {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        lookahead.next().map(|(_, c)| c)
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenizes the whole input. Illegal characters never abort lexing; they are
/// returned as diagnostics next to the tokens that could be read.
pub fn tokenize(input: &str) -> (Vec<Token<'_>>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }
    (tokens, lexer.into_diagnostics())
}

/// Normalises an integer literal the way the target language prints it:
/// `+` is dropped, leading zeros are removed and `-0` becomes `0`.
pub fn normalize_integer(lexeme: &str) -> String {
    let (negative, digits) = match lexeme.as_bytes().first() {
        Some(b'-') => (true, &lexeme[1..]),
        Some(b'+') => (false, &lexeme[1..]),
        _ => (false, lexeme),
    };
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        "0".to_string()
    } else if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    }
}

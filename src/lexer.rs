pub mod error;

use std::{iter::Peekable, str::CharIndices};

pub use error::{LexError, LexResult};

use crate::token::{Span, Token, TokenKind};

const TAB_WIDTH: usize = 8;

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    indent_stack: Vec<usize>,
    pending_tokens: Vec<Token<'a>>,
    brackets: Vec<char>,
    at_line_start: bool,
    line_has_tokens: bool,
    eof_reached: bool,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            indent_stack: vec![0],
            pending_tokens: Vec::new(),
            brackets: Vec::new(),
            at_line_start: true,
            line_has_tokens: false,
            eof_reached: false,
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        if let Some(token) = self.pending_tokens.pop() {
            return Ok(token);
        }

        if self.eof_reached {
            return Ok(Token::new(TokenKind::EOF, self.empty_span()));
        }

        if self.at_line_start && self.brackets.is_empty() {
            self.at_line_start = false;
            if let Some(level) = self.measure_indentation() {
                if let Some(token) = self.indentation_token(level)? {
                    return Ok(token);
                }
            }
        }

        loop {
            self.skip_inline_whitespace();
            let Some(&(start, ch)) = self.chars.peek() else {
                return Ok(self.finish());
            };
            let line = self.line;
            let column = self.column;

            match ch {
                '\n' if !self.brackets.is_empty() => {
                    self.advance_char();
                }
                '\n' => {
                    self.advance_char();
                    self.at_line_start = true;
                    self.line_has_tokens = false;
                    return Ok(Token::new(
                        TokenKind::Newline,
                        Span {
                            start,
                            end: start + 1,
                            line,
                            column,
                        },
                    ));
                }
                '#' => self.skip_comment(),
                '\\' if self.peek_nth(1) == Some('\n') => {
                    self.advance_char();
                    self.advance_char();
                }
                _ => {
                    let token = self.read_token(start, ch)?;
                    self.line_has_tokens = true;
                    return Ok(token);
                }
            }
        }
    }

    fn read_token(&mut self, start: usize, ch: char) -> LexResult<Token<'a>> {
        let line = self.line;
        let column = self.column;
        match ch {
            '"' | '\'' => return self.read_string(start, ch),
            c if c.is_alphabetic() || c == '_' => return Ok(self.read_identifier(start)),
            c if c.is_ascii_digit() => return self.read_number(start),
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                return self.read_number(start);
            }
            _ => {}
        }

        let (kind, width) = match (ch, self.peek_nth(1), self.peek_nth(2)) {
            ('*', Some('*'), Some('=')) => (TokenKind::DoubleStarEqual, 3),
            ('*', Some('*'), _) => (TokenKind::DoubleStar, 2),
            ('*', Some('='), _) => (TokenKind::StarEqual, 2),
            ('*', ..) => (TokenKind::Star, 1),
            ('/', Some('/'), Some('=')) => (TokenKind::DoubleSlashEqual, 3),
            ('/', Some('/'), _) => (TokenKind::DoubleSlash, 2),
            ('/', Some('='), _) => (TokenKind::SlashEqual, 2),
            ('/', ..) => (TokenKind::Slash, 1),
            ('+', Some('='), _) => (TokenKind::PlusEqual, 2),
            ('+', ..) => (TokenKind::Plus, 1),
            ('-', Some('='), _) => (TokenKind::MinusEqual, 2),
            ('-', ..) => (TokenKind::Minus, 1),
            ('%', Some('='), _) => (TokenKind::PercentEqual, 2),
            ('%', ..) => (TokenKind::Percent, 1),
            ('=', Some('='), _) => (TokenKind::EqEq, 2),
            ('=', ..) => (TokenKind::Equal, 1),
            ('!', Some('='), _) => (TokenKind::NotEq, 2),
            ('<', Some('='), _) => (TokenKind::LessEqual, 2),
            ('<', ..) => (TokenKind::Less, 1),
            ('>', Some('='), _) => (TokenKind::GreaterEqual, 2),
            ('>', ..) => (TokenKind::Greater, 1),
            (':', ..) => (TokenKind::Colon, 1),
            (';', ..) => (TokenKind::Semicolon, 1),
            (',', ..) => (TokenKind::Comma, 1),
            ('.', ..) => (TokenKind::Dot, 1),
            ('(', ..) => (TokenKind::LParen, 1),
            (')', ..) => (TokenKind::RParen, 1),
            ('[', ..) => (TokenKind::LBracket, 1),
            (']', ..) => (TokenKind::RBracket, 1),
            ('{', ..) => (TokenKind::LBrace, 1),
            ('}', ..) => (TokenKind::RBrace, 1),
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    character: ch,
                    line,
                    column,
                });
            }
        };

        match ch {
            '(' | '[' | '{' => self.brackets.push(ch),
            ')' | ']' | '}' => {
                let opener = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if self.brackets.pop() != Some(opener) {
                    return Err(LexError::UnbalancedBracket {
                        bracket: ch,
                        line,
                        column,
                    });
                }
            }
            _ => {}
        }

        for _ in 0..width {
            self.advance_char();
        }
        Ok(Token::new(
            kind,
            Span {
                start,
                end: start + width,
                line,
                column,
            },
        ))
    }

    /// Consumes leading whitespace of the next logical line, skipping blank
    /// and comment-only lines. Returns `None` at end of input.
    fn measure_indentation(&mut self) -> Option<usize> {
        loop {
            let mut level = 0;
            while let Some(&(_, c)) = self.chars.peek() {
                match c {
                    ' ' => level += 1,
                    '\t' => level = (level / TAB_WIDTH + 1) * TAB_WIDTH,
                    '\x0c' => level = 0,
                    '\r' => {}
                    _ => break,
                }
                self.advance_char();
            }
            match self.chars.peek() {
                None => return None,
                Some(&(_, '#')) => {
                    self.skip_comment();
                    self.advance_char();
                }
                Some(&(_, '\n')) => {
                    self.advance_char();
                }
                Some(_) => return Some(level),
            }
        }
    }

    fn indentation_token(&mut self, level: usize) -> LexResult<Option<Token<'a>>> {
        let current = self.indent_stack.last().copied().unwrap_or(0);
        let span = self.empty_span();
        if level > current {
            self.indent_stack.push(level);
            return Ok(Some(Token::new(TokenKind::Indent, span)));
        }
        while self.indent_stack.last().is_some_and(|&top| top > level) {
            self.indent_stack.pop();
            self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
        }
        if self.indent_stack.last().copied().unwrap_or(0) != level {
            return Err(LexError::InvalidDedent {
                indent_level: level,
                line: self.line,
            });
        }
        Ok(self.pending_tokens.pop())
    }

    /// Emits the closing newline and dedents once the input is exhausted.
    fn finish(&mut self) -> Token<'a> {
        self.eof_reached = true;
        let span = self.empty_span();
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
        }
        if self.line_has_tokens {
            self.line_has_tokens = false;
            return Token::new(TokenKind::Newline, span);
        }
        self.pending_tokens
            .pop()
            .unwrap_or_else(|| Token::new(TokenKind::EOF, span))
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if matches!(c, ' ' | '\t' | '\r' | '\x0c') {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        let line = self.line;
        let column = self.column;
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let ident = &self.input[start..end];
        let kind = match ident {
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "pass" => TokenKind::Pass,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(
            kind,
            Span {
                start,
                end,
                line,
                column,
            },
        )
    }

    fn read_number(&mut self, start: usize) -> LexResult<Token<'a>> {
        let line = self.line;
        let column = self.column;
        let mut is_float = false;
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' if !is_float => is_float = true,
                'e' | 'E' if self.exponent_follows() => {
                    is_float = true;
                    self.advance_char();
                    if matches!(self.chars.peek(), Some(&(_, '+' | '-'))) {
                        self.advance_char();
                    }
                    continue;
                }
                _ => break,
            }
            self.advance_char();
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let digits = literal.replace('_', "");
        let invalid = || LexError::InvalidNumberLiteral {
            literal: literal.to_string(),
            line,
            column,
        };
        let kind = if is_float {
            TokenKind::Float(digits.parse().map_err(|_| invalid())?)
        } else {
            // Arbitrary precision: the literal is kept as written.
            let leading_zero = digits.len() > 1
                && digits.starts_with('0')
                && digits.bytes().any(|b| b != b'0');
            if literal.ends_with('_') || literal.contains("__") || leading_zero {
                return Err(invalid());
            }
            TokenKind::Integer(literal)
        };
        Ok(Token::new(
            kind,
            Span {
                start,
                end,
                line,
                column,
            },
        ))
    }

    fn exponent_follows(&self) -> bool {
        match self.peek_nth(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    /// Reads a single-line string literal. Escapes are kept verbatim.
    fn read_string(&mut self, start: usize, quote: char) -> LexResult<Token<'a>> {
        let line = self.line;
        let column = self.column;
        self.advance_char();
        let content_start = start + quote.len_utf8();
        while let Some(&(index, c)) = self.chars.peek() {
            match c {
                '\n' => break,
                '\\' => {
                    self.advance_char();
                    if matches!(self.chars.peek(), Some(&(_, '\n')) | None) {
                        break;
                    }
                }
                c if c == quote => {
                    self.advance_char();
                    return Ok(Token::new(
                        TokenKind::String(&self.input[content_start..index]),
                        Span {
                            start,
                            end: index + quote.len_utf8(),
                            line,
                            column,
                        },
                    ));
                }
                _ => {}
            }
            self.advance_char();
        }
        Err(LexError::UnterminatedString { line, column })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_token())
    }
}

impl<'a> Lexer<'a> {
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

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n).map(|(_, c)| c)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }

    fn empty_span(&mut self) -> Span {
        let index = self.current_index();
        Span {
            start: index,
            end: index,
            line: self.line,
            column: self.column,
        }
    }
}

pub fn tokenize<'a>(input: &'a str) -> LexResult<Vec<Token<'a>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {"
            def fn():
                n = 4 + 4
                print(n)
            fn()
        "};
        let expected_tokens = vec![
            TokenKind::Def,
            TokenKind::Identifier("fn"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier("n"),
            TokenKind::Equal,
            TokenKind::Integer("4"),
            TokenKind::Plus,
            TokenKind::Integer("4"),
            TokenKind::Newline,
            TokenKind::Identifier("print"),
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Identifier("fn"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::EOF,
        ];
        assert_eq!(kinds(input), expected_tokens);
    }

    #[test]
    fn tab_indentation_and_missing_final_newline() {
        assert_eq!(
            kinds("while True:\n\tbreak"),
            vec![
                TokenKind::While,
                TokenKind::True,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Break,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn skips_blank_lines_comments_and_bracket_newlines() {
        let input = indoc! {"
            # leading comment
            a = [1,
                 2]  # trailing

            b //= 2
        "};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Identifier("a"),
                TokenKind::Equal,
                TokenKind::LBracket,
                TokenKind::Integer("1"),
                TokenKind::Comma,
                TokenKind::Integer("2"),
                TokenKind::RBracket,
                TokenKind::Newline,
                TokenKind::Identifier("b"),
                TokenKind::DoubleSlashEqual,
                TokenKind::Integer("2"),
                TokenKind::Newline,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn reads_literals() {
        assert_eq!(
            kinds("x = 2.5 ** 'it\\'s' != None\n"),
            vec![
                TokenKind::Identifier("x"),
                TokenKind::Equal,
                TokenKind::Float(2.5),
                TokenKind::DoubleStar,
                TokenKind::String("it\\'s"),
                TokenKind::NotEq,
                TokenKind::None,
                TokenKind::Newline,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn errors_on_invalid_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '@',
                line: 1,
                column: 6
            }
        );
    }

    #[test]
    fn keeps_integers_of_any_length() {
        assert_eq!(
            kinds("n = 99999999999999999999999999\n")[2],
            TokenKind::Integer("99999999999999999999999999")
        );
        assert_eq!(kinds("n = 1_000\n")[2], TokenKind::Integer("1_000"));
    }

    #[test]
    fn errors_on_malformed_integers() {
        for input in ["n = 1__0\n", "n = 10_\n", "n = 007\n"] {
            let err = tokenize(input).expect_err("expected invalid literal");
            assert!(err.to_string().contains("Invalid number literal"), "{input:?}");
        }
        assert_eq!(kinds("n = 000\n")[2], TokenKind::Integer("000"));
    }

    #[test]
    fn errors_on_inconsistent_dedent() {
        let input = "if a:\n        b = 1\n    c = 2\n";
        assert!(matches!(
            tokenize(input),
            Err(LexError::InvalidDedent { indent_level: 4, .. })
        ));
    }
}

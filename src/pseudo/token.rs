use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Procedure,
    Return,
    If,
    Then,
    Else,
    EndIf,
    For,
    Do,
    EndFor,
    EndProc,
    Repeat,
    Until,
    And,
    Or,
    Not,
    In,
    To,
    By,

    // Comparison
    Eq,    // = or ==
    NotEq, // !=
    Gt,    // >
    Ge,    // >=
    Lt,    // <
    Le,    // <=

    // Arithmetic
    Plus,      // +
    Minus,     // -
    Times,     // *
    Divide,    // /
    IntDivide, // //
    Mod,       // %
    Power,     // ^

    // Delimiters
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Assign,   // <-
    Comma,    // ,

    Number,
    Name,
}

impl TokenKind {
    /// Keyword lookup is case-insensitive and wins over identifiers.
    pub fn keyword(ident: &str) -> Option<Self> {
        let kind = match ident.to_ascii_lowercase().as_str() {
            "procedure" => TokenKind::Procedure,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "endif" => TokenKind::EndIf,
            "for" => TokenKind::For,
            "do" => TokenKind::Do,
            "endfor" => TokenKind::EndFor,
            "endproc" => TokenKind::EndProc,
            "repeat" => TokenKind::Repeat,
            "until" => TokenKind::Until,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "to" => TokenKind::To,
            "by" => TokenKind::By,
            _ => return None,
        };
        Some(kind)
    }

    /// Tokens after which a `+`/`-` is a binary operator rather than a sign.
    pub fn ends_operand(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::Name
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }

    pub fn is_block_terminator(self) -> bool {
        matches!(
            self,
            TokenKind::EndIf
                | TokenKind::Else
                | TokenKind::EndFor
                | TokenKind::EndProc
                | TokenKind::Until
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, lexeme: &'a str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

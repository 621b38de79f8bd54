#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    /// Decimal literal exactly as written.
    Integer(&'a str),
    Float(f64),
    String(&'a str),
    True,
    False,
    None,

    // Keywords
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Def,
    Return,
    Pass,
    Break,
    Continue,
    And,
    Or,
    Not,
    Is,

    // Assignment
    Equal,            // =
    PlusEqual,        // +=
    MinusEqual,       // -=
    StarEqual,        // *=
    SlashEqual,       // /=
    DoubleSlashEqual, // //=
    PercentEqual,     // %=
    DoubleStarEqual,  // **=

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    DoubleSlash,  // //
    Percent,      // %
    DoubleStar,   // **
    EqEq,         // ==
    NotEq,        // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=

    // Delimiters
    Colon,     // :
    Semicolon, // ;
    Comma,     // ,
    Dot,       // .
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }

    // Structural
    Newline,
    Indent,
    Dedent,
    EOF,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &TokenKind<'a> {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

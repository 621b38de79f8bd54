//! Precedence grammar for the pseudocode notation.
//!
//! Every production synthesises target-language text directly. Nested blocks
//! are wrapped in [`BLOCK_BEGIN`]/[`BLOCK_END`] marker lines so that no
//! production has to know its own nesting depth; [`super::indent`] turns the
//! markers into indentation afterwards.

use super::error::Diagnostic;
use super::indent::{BLOCK_BEGIN, BLOCK_END};
use super::lexer::normalize_integer;
use super::token::{Span, Token, TokenKind};

/// Outcome of one parse. `code` is `None` only when no top-level statement
/// could be reduced; otherwise it is a best-effort result and `diagnostics`
/// lists whatever went wrong along the way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseResult {
    pub code: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn is_clean(&self) -> bool {
        self.code.is_some() && self.diagnostics.is_empty()
    }
}

#[derive(Debug)]
struct SyntaxError {
    near: String,
    span: Span,
}

type Synth<T = String> = Result<T, SyntaxError>;

pub struct Grammar<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    /// Terminators of every block currently being parsed, innermost last.
    open_blocks: Vec<&'static [TokenKind]>,
}

impl<'t, 'a> Grammar<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            open_blocks: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> ParseResult {
        let (code, reduced) = self.parse_statements(&[]);
        if reduced == 0 && self.diagnostics.is_empty() {
            let error = self.unexpected();
            self.report(error);
        }
        ParseResult {
            code: (reduced > 0).then_some(code),
            diagnostics: self.diagnostics,
        }
    }

    /// Stops at a terminator of this block or of any enclosing one, so an
    /// unclosed inner block leaves the outer terminator in place.
    fn parse_statements(&mut self, terminators: &'static [TokenKind]) -> (String, usize) {
        let mut code = String::new();
        let mut reduced = 0;
        self.open_blocks.push(terminators);
        while let Some(kind) = self.current_kind() {
            if self.closes_open_block(kind) {
                break;
            }
            match self.parse_statement() {
                Ok(text) => {
                    code.push_str(&text);
                    reduced += 1;
                }
                Err(error) => {
                    self.report(error);
                    self.recover();
                }
            }
        }
        self.open_blocks.pop();
        (code, reduced)
    }

    /// A block whose statements all failed still yields a runnable body.
    fn parse_block(&mut self, terminators: &'static [TokenKind]) -> Synth {
        let reported = self.diagnostics.len();
        let (code, reduced) = self.parse_statements(terminators);
        if reduced > 0 {
            return Ok(code);
        }
        if self.diagnostics.len() == reported {
            return Err(self.unexpected());
        }
        Ok("pass\n".to_string())
    }

    fn parse_statement(&mut self) -> Synth {
        match self.current_kind() {
            Some(TokenKind::If) => self.parse_condition(),
            Some(TokenKind::For) => self.parse_for(),
            Some(TokenKind::Repeat) => self.parse_repeat(),
            Some(TokenKind::Procedure) => self.parse_procedure(),
            Some(TokenKind::Return) => self.parse_return(),
            Some(TokenKind::Name) => self.parse_assignment(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_assignment(&mut self) -> Synth {
        let target = self.parse_lvalue()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_calc()?;
        Ok(format!("{target} = {value}\n"))
    }

    fn parse_lvalue(&mut self) -> Synth {
        let name = self.expect(TokenKind::Name)?.lexeme;
        if !self.eat(TokenKind::LBracket) {
            return Ok(name.to_string());
        }
        let index = match self.current() {
            Some(token) if token.kind == TokenKind::Number => normalize_integer(token.lexeme),
            Some(token) if token.kind == TokenKind::Name => token.lexeme.to_string(),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        self.expect(TokenKind::RBracket)?;
        Ok(format!("{name}[{index}]"))
    }

    // Arithmetic: (+ -) < (* / // %) < ^ < operands.

    fn parse_calc(&mut self) -> Synth {
        let mut text = self.parse_term()?;
        while let Some(op) = self.eat_any(&[TokenKind::Plus, TokenKind::Minus]) {
            let rhs = self.parse_term()?;
            text = format!("{text} {op} {rhs}");
        }
        Ok(text)
    }

    fn parse_term(&mut self) -> Synth {
        let mut text = self.parse_power()?;
        while let Some(op) = self.eat_any(&[
            TokenKind::Times,
            TokenKind::Divide,
            TokenKind::IntDivide,
            TokenKind::Mod,
        ]) {
            let rhs = self.parse_power()?;
            text = format!("{text} {op} {rhs}");
        }
        Ok(text)
    }

    fn parse_power(&mut self) -> Synth {
        let base = self.parse_operand()?;
        if self.eat(TokenKind::Power) {
            let exponent = self.parse_power()?;
            return Ok(format!("{base} ** {exponent}"));
        }
        Ok(base)
    }

    fn parse_operand(&mut self) -> Synth {
        let Some(token) = self.current() else {
            return Err(self.unexpected());
        };
        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_calc()?;
                self.expect(TokenKind::RParen)?;
                Ok(format!("({inner})"))
            }
            TokenKind::Number => {
                self.advance();
                Ok(normalize_integer(token.lexeme))
            }
            TokenKind::Name => {
                self.advance();
                let name = token.lexeme;
                if self.eat(TokenKind::LParen) {
                    let args = self.parse_list(TokenKind::RParen)?;
                    Ok(format!("{name}({})", args.join(", ")))
                } else if self.eat(TokenKind::LBracket) {
                    let index = self.parse_calc()?;
                    self.expect(TokenKind::RBracket)?;
                    Ok(format!("{name}[{index}]"))
                } else {
                    Ok(name.to_string())
                }
            }
            TokenKind::LBrace => {
                self.advance();
                // `{}` would be a mapping in the target language, not a set.
                if self.current_kind() == Some(TokenKind::RBrace) {
                    return Err(self.unexpected());
                }
                let values = self.parse_list(TokenKind::RBrace)?;
                Ok(format!("{{{}}}", values.join(",")))
            }
            TokenKind::LBracket => {
                self.advance();
                let values = self.parse_list(TokenKind::RBracket)?;
                Ok(format!("[{}]", values.join(",")))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Comma separated expressions up to and including `close`.
    fn parse_list(&mut self, close: TokenKind) -> Synth<Vec<String>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_calc()?);
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }

    // Conditions

    fn parse_cond(&mut self) -> Synth {
        let mut text = self.parse_cond_unit()?;
        loop {
            let op = match self.current_kind() {
                Some(TokenKind::And) => "and",
                Some(TokenKind::Or) => "or",
                _ => break,
            };
            self.advance();
            let rhs = self.parse_cond_unit()?;
            text = format!("{text} {op} {rhs}");
        }
        Ok(text)
    }

    fn parse_cond_unit(&mut self) -> Synth {
        match self.current_kind() {
            Some(TokenKind::Not) => {
                self.advance();
                let inner = self.parse_cond_unit()?;
                Ok(format!(" not({inner})"))
            }
            Some(TokenKind::LParen) => {
                let start = self.pos;
                if let Ok(group) = self.parse_cond_group()
                    && !self.continues_operand()
                {
                    return Ok(group);
                }
                // `(a + 1) > b`: the parentheses belong to an arithmetic operand.
                self.pos = start;
                self.parse_comparison()
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_cond_group(&mut self) -> Synth {
        self.expect(TokenKind::LParen)?;
        let inner = self.parse_cond()?;
        self.expect(TokenKind::RParen)?;
        Ok(format!("({inner})"))
    }

    fn parse_comparison(&mut self) -> Synth {
        let lhs = self.parse_calc()?;
        let op = match self.current_kind() {
            Some(TokenKind::Eq) => "==",
            Some(TokenKind::NotEq) => "!=",
            Some(TokenKind::Gt) => ">",
            Some(TokenKind::Ge) => ">=",
            Some(TokenKind::Lt) => "<",
            Some(TokenKind::Le) => "<=",
            Some(TokenKind::In) => "in",
            Some(TokenKind::Not) if self.kind_at(self.pos + 1) == Some(TokenKind::In) => {
                self.advance();
                "not in"
            }
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_calc()?;
        Ok(format!("{lhs} {op} {rhs}"))
    }

    fn continues_operand(&self) -> bool {
        match self.current_kind() {
            Some(
                TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::In
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Times
                | TokenKind::Divide
                | TokenKind::IntDivide
                | TokenKind::Mod
                | TokenKind::Power,
            ) => true,
            Some(TokenKind::Not) => self.kind_at(self.pos + 1) == Some(TokenKind::In),
            _ => false,
        }
    }

    fn parse_condition(&mut self) -> Synth {
        self.expect(TokenKind::If)?;
        let cond = self.parse_cond()?;
        self.expect(TokenKind::Then)?;
        let body = self.parse_block(&[TokenKind::Else, TokenKind::EndIf])?;
        let mut text = format!("if {cond}:\n{BLOCK_BEGIN}\n{body}{BLOCK_END}\n");
        if self.eat(TokenKind::Else) {
            let else_body = self.parse_block(&[TokenKind::EndIf])?;
            text.push_str(&format!("else:\n{BLOCK_BEGIN}\n{else_body}{BLOCK_END}\n"));
        }
        self.expect(TokenKind::EndIf)?;
        Ok(text)
    }

    // Loops

    fn parse_repeat(&mut self) -> Synth {
        self.expect(TokenKind::Repeat)?;
        let body = self.parse_block(&[TokenKind::Until])?;
        self.expect(TokenKind::Until)?;
        let cond = self.parse_cond()?;
        Ok(format!(
            "while True:\n{BLOCK_BEGIN}\n{body}if {cond}:\n{BLOCK_BEGIN}\nbreak\n{BLOCK_END}\n{BLOCK_END}\n"
        ))
    }

    fn parse_for(&mut self) -> Synth {
        self.expect(TokenKind::For)?;
        let var = self.expect(TokenKind::Name)?.lexeme;
        self.expect(TokenKind::In)?;
        let source = self.parse_calc()?;
        let header = if self.eat(TokenKind::To) {
            let stop = self.parse_calc()?;
            if self.eat(TokenKind::By) {
                let step = self.parse_calc()?;
                format!("{var} in range({source},{stop},{step})")
            } else {
                format!("{var} in range({source},{stop})")
            }
        } else {
            format!("{var} in {source}")
        };
        self.expect(TokenKind::Do)?;
        let body = self.parse_block(&[TokenKind::EndFor])?;
        self.expect(TokenKind::EndFor)?;
        Ok(format!("for {header}:\n{BLOCK_BEGIN}\n{body}{BLOCK_END}\n"))
    }

    // Procedures

    fn parse_procedure(&mut self) -> Synth {
        self.expect(TokenKind::Procedure)?;
        let name = self.expect(TokenKind::Name)?.lexeme;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.eat(TokenKind::RParen) {
            loop {
                params.push(self.expect(TokenKind::Name)?.lexeme);
                if self.eat(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen)?;
                break;
            }
        }
        let body = self.parse_block(&[TokenKind::EndProc])?;
        self.expect(TokenKind::EndProc)?;
        Ok(format!(
            "def {name} ({}):\n{BLOCK_BEGIN}\n{body}{BLOCK_END}\n",
            params.join(",")
        ))
    }

    fn parse_return(&mut self) -> Synth {
        self.expect(TokenKind::Return)?;
        if self.starts_expression() && !self.starts_assignment(self.pos) {
            let value = self.parse_calc()?;
            return Ok(format!("return {value}\n"));
        }
        Ok("return\n".to_string())
    }

    // Lookahead helpers

    fn starts_expression(&self) -> bool {
        matches!(
            self.current_kind(),
            Some(
                TokenKind::Number
                    | TokenKind::Name
                    | TokenKind::LParen
                    | TokenKind::LBrace
                    | TokenKind::LBracket
            )
        )
    }

    fn starts_assignment(&self, at: usize) -> bool {
        match (self.kind_at(at), self.kind_at(at + 1)) {
            (Some(TokenKind::Name), Some(TokenKind::Assign)) => true,
            (Some(TokenKind::Name), Some(TokenKind::LBracket)) => {
                matches!(
                    self.kind_at(at + 2),
                    Some(TokenKind::Number | TokenKind::Name)
                ) && self.kind_at(at + 3) == Some(TokenKind::RBracket)
                    && self.kind_at(at + 4) == Some(TokenKind::Assign)
            }
            _ => false,
        }
    }

    fn starts_statement(&self) -> bool {
        match self.current_kind() {
            Some(
                TokenKind::If
                | TokenKind::For
                | TokenKind::Repeat
                | TokenKind::Procedure
                | TokenKind::Return,
            ) => true,
            Some(TokenKind::Name) => self.starts_assignment(self.pos),
            _ => false,
        }
    }

    /// Skips the offending token and everything up to the next statement start
    /// or block terminator. A terminator some open block is waiting for is
    /// never skipped.
    fn recover(&mut self) {
        if !self
            .current_kind()
            .is_some_and(|kind| self.closes_open_block(kind))
        {
            self.advance();
        }
        while let Some(kind) = self.current_kind() {
            if kind.is_block_terminator() || self.starts_statement() {
                break;
            }
            self.advance();
        }
    }

    fn closes_open_block(&self, kind: TokenKind) -> bool {
        self.open_blocks
            .iter()
            .any(|terminators| terminators.contains(&kind))
    }

    // Token cursor

    fn current(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.kind_at(self.pos)
    }

    fn kind_at(&self, at: usize) -> Option<TokenKind> {
        self.tokens.get(at).map(|token| token.kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.current_kind() == Some(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_any(&mut self, kinds: &[TokenKind]) -> Option<&'a str> {
        let token = self.current().filter(|token| kinds.contains(&token.kind))?;
        self.advance();
        Some(token.lexeme)
    }

    fn expect(&mut self, kind: TokenKind) -> Synth<&'t Token<'a>> {
        match self.current() {
            Some(token) if token.kind == kind => {
                self.advance();
                Ok(token)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn unexpected(&self) -> SyntaxError {
        match self.current() {
            Some(token) => SyntaxError {
                near: format!("'{}'", token.lexeme),
                span: token.span,
            },
            None => SyntaxError {
                near: "end of input".to_string(),
                span: self.tokens.last().map(|token| token.span).unwrap_or_default(),
            },
        }
    }

    fn report(&mut self, error: SyntaxError) {
        tracing::debug!(near = %error.near, line = error.span.line, "syntax error");
        self.diagnostics.push(Diagnostic::syntax(
            format!("syntax error near {}", error.near),
            error.span,
        ));
    }
}

pub fn parse(tokens: &[Token<'_>]) -> ParseResult {
    Grammar::new(tokens).parse_program()
}

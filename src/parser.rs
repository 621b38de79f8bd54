use thiserror::Error;

use crate::ast::{
    AssignTarget, BinaryOperator, BoolOperator, CompareOperator, Expression, Module, Statement,
    UnaryOperator,
};
use crate::lexer::{LexError, tokenize};
use crate::token::{Token, TokenKind};

/// Failure to turn target code into a syntax tree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeBuildError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Expected {expected}, found {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Cannot assign to expression at line {line}, column {column}")]
    InvalidTarget { line: usize, column: usize },
}

pub type ParseResult<T> = Result<T, TreeBuildError>;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with an EOF token, as produced by [`tokenize`].
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse_module(mut self) -> ParseResult<Module> {
        let mut body = Vec::new();
        while !self.at(TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        Ok(Module { body })
    }

    fn parse_statement(&mut self) -> ParseResult<Vec<Statement>> {
        let statement = match self.current().kind {
            TokenKind::Def => self.parse_function_def()?,
            TokenKind::If => {
                self.advance();
                self.parse_if_tail()?
            }
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            _ => return self.parse_simple_statements(),
        };
        Ok(vec![statement])
    }

    fn parse_function_def(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Def, "'def'")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Colon, "':'")?;
        let body = self.parse_suite()?;
        Ok(Statement::FunctionDef { name, params, body })
    }

    /// Parses everything after `if` or `elif`.
    fn parse_if_tail(&mut self) -> ParseResult<Statement> {
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let then_body = self.parse_suite()?;
        let else_body = if self.eat(TokenKind::Elif) {
            vec![self.parse_if_tail()?]
        } else if self.eat(TokenKind::Else) {
            self.expect(TokenKind::Colon, "':'")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::While, "'while'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let body = self.parse_suite()?;
        Ok(Statement::While { condition, body })
    }

    fn parse_for(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::For, "'for'")?;
        let target = self.expect_identifier()?;
        self.expect(TokenKind::In, "'in'")?;
        let iterable = self.parse_expression_list()?;
        self.expect(TokenKind::Colon, "':'")?;
        let body = self.parse_suite()?;
        Ok(Statement::For {
            target,
            iterable,
            body,
        })
    }

    /// Indented block, or simple statements on the header line.
    fn parse_suite(&mut self) -> ParseResult<Vec<Statement>> {
        if !self.eat(TokenKind::Newline) {
            return self.parse_simple_statements();
        }
        self.expect(TokenKind::Indent, "indented block")?;
        let mut body = Vec::new();
        while !self.at(TokenKind::Dedent) && !self.at(TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        self.expect(TokenKind::Dedent, "dedent")?;
        Ok(body)
    }

    fn parse_simple_statements(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = vec![self.parse_simple_statement()?];
        while self.eat(TokenKind::Semicolon) {
            if self.at(TokenKind::Newline) {
                break;
            }
            statements.push(self.parse_simple_statement()?);
        }
        self.expect(TokenKind::Newline, "newline")?;
        Ok(statements)
    }

    fn parse_simple_statement(&mut self) -> ParseResult<Statement> {
        match self.current().kind {
            TokenKind::Pass => {
                self.advance();
                return Ok(Statement::Pass);
            }
            TokenKind::Break => {
                self.advance();
                return Ok(Statement::Break);
            }
            TokenKind::Continue => {
                self.advance();
                return Ok(Statement::Continue);
            }
            TokenKind::Return => {
                self.advance();
                if matches!(
                    self.current().kind,
                    TokenKind::Newline | TokenKind::Semicolon | TokenKind::EOF
                ) {
                    return Ok(Statement::Return(None));
                }
                return Ok(Statement::Return(Some(self.parse_expression_list()?)));
            }
            _ => {}
        }

        let target_token = self.current().clone();
        let expression = self.parse_expression_list()?;
        if self.eat(TokenKind::Equal) {
            let target = self.assign_target(expression, &target_token)?;
            let value = self.parse_expression_list()?;
            return Ok(Statement::Assign { target, value });
        }
        if let Some(op) = augmented_operator(&self.current().kind) {
            self.advance();
            let target = self.assign_target(expression, &target_token)?;
            let value = self.parse_expression_list()?;
            return Ok(Statement::AugAssign { target, op, value });
        }
        Ok(Statement::Expr(expression))
    }

    fn assign_target(&self, expression: Expression, at: &Token<'a>) -> ParseResult<AssignTarget> {
        match expression {
            Expression::Name(name) => Ok(AssignTarget::Name(name)),
            Expression::Subscript { object, index } => Ok(AssignTarget::Index {
                object: *object,
                index: *index,
            }),
            Expression::Attribute { object, name } => Ok(AssignTarget::Attribute {
                object: *object,
                name,
            }),
            _ => Err(TreeBuildError::InvalidTarget {
                line: at.span.line,
                column: at.span.column,
            }),
        }
    }

    /// Comma-separated expressions; more than one forms a tuple.
    fn parse_expression_list(&mut self) -> ParseResult<Expression> {
        let first = self.parse_expression()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_expression()?);
        }
        Ok(Expression::Tuple(items))
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expression::BoolOp {
                left: Box::new(left),
                op: BoolOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_not()?;
        while self.eat(TokenKind::And) {
            let right = self.parse_not()?;
            left = Expression::BoolOp {
                left: Box::new(left),
                op: BoolOperator::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expression> {
        if self.eat(TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let left = self.parse_arithmetic()?;
        let mut comparisons = Vec::new();
        while let Some(op) = self.comparison_operator() {
            comparisons.push((op, self.parse_arithmetic()?));
        }
        if comparisons.is_empty() {
            return Ok(left);
        }
        Ok(Expression::Compare {
            left: Box::new(left),
            comparisons,
        })
    }

    fn comparison_operator(&mut self) -> Option<CompareOperator> {
        let op = match self.current().kind {
            TokenKind::EqEq => CompareOperator::Eq,
            TokenKind::NotEq => CompareOperator::NotEq,
            TokenKind::Less => CompareOperator::Lt,
            TokenKind::LessEqual => CompareOperator::LtE,
            TokenKind::Greater => CompareOperator::Gt,
            TokenKind::GreaterEqual => CompareOperator::GtE,
            TokenKind::In => CompareOperator::In,
            TokenKind::Not if self.peek_kind() == TokenKind::In => {
                self.advance();
                CompareOperator::NotIn
            }
            TokenKind::Is if self.peek_kind() == TokenKind::Not => {
                self.advance();
                CompareOperator::IsNot
            }
            TokenKind::Is => CompareOperator::Is,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_arithmetic(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                TokenKind::DoubleSlash => BinaryOperator::FloorDiv,
                TokenKind::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOperator::Neg,
            TokenKind::Plus => UnaryOperator::Pos,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_factor()?;
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> ParseResult<Expression> {
        let base = self.parse_postfix()?;
        if self.eat(TokenKind::DoubleStar) {
            let exponent = self.parse_factor()?;
            return Ok(binary(base, BinaryOperator::Pow, exponent));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(TokenKind::LParen) {
                let args = self.parse_items(TokenKind::RParen, "')'")?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.eat(TokenKind::LBracket) {
                let index = self.parse_expression_list()?;
                self.expect(TokenKind::RBracket, "']'")?;
                expr = Expression::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(TokenKind::Dot) {
                let name = self.expect_identifier()?;
                expr = Expression::Attribute {
                    object: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_atom(&mut self) -> ParseResult<Expression> {
        let token = self.current().clone();
        let expr = match token.kind {
            TokenKind::Integer(value) => Expression::Integer(value.to_string()),
            TokenKind::Float(value) => Expression::Float(value),
            TokenKind::String(value) => {
                self.advance();
                let mut text = value.to_string();
                // Adjacent literals concatenate.
                while let TokenKind::String(next) = self.current().kind {
                    text.push_str(next);
                    self.advance();
                }
                return Ok(Expression::String(text));
            }
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::None => Expression::NoneLiteral,
            TokenKind::Identifier(name) => Expression::Name(name.to_string()),
            TokenKind::LParen => {
                self.advance();
                if self.eat(TokenKind::RParen) {
                    return Ok(Expression::Tuple(Vec::new()));
                }
                let inner = self.parse_expression_list()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                self.advance();
                return Ok(Expression::List(
                    self.parse_items(TokenKind::RBracket, "']'")?,
                ));
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_brace_display();
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    /// `{}` is an empty dict; otherwise the first entry decides dict or set.
    fn parse_brace_display(&mut self) -> ParseResult<Expression> {
        if self.eat(TokenKind::RBrace) {
            return Ok(Expression::Dict(Vec::new()));
        }
        let first = self.parse_expression()?;
        if !self.eat(TokenKind::Colon) {
            let mut items = vec![first];
            if self.eat(TokenKind::Comma) {
                items.extend(self.parse_items(TokenKind::RBrace, "'}'")?);
            } else {
                self.expect(TokenKind::RBrace, "'}'")?;
            }
            return Ok(Expression::Set(items));
        }
        let mut entries = vec![(first, self.parse_expression()?)];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::RBrace) {
                break;
            }
            let key = self.parse_expression()?;
            self.expect(TokenKind::Colon, "':'")?;
            entries.push((key, self.parse_expression()?));
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Expression::Dict(entries))
    }

    /// Comma-separated expressions up to `close`, allowing a trailing comma.
    fn parse_items(
        &mut self,
        close: TokenKind<'static>,
        expected: &'static str,
    ) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, expected)?;
        Ok(items)
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::String(_)
                | TokenKind::Identifier(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::None
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Not
        )
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while self.eat(TokenKind::Newline) {
            consumed = true;
        }
        consumed
    }

    fn current(&self) -> &Token<'a> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn peek_kind(&self) -> TokenKind<'a> {
        self.tokens
            .get(self.position + 1)
            .map_or(TokenKind::EOF, |token| token.kind)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn at(&self, kind: TokenKind<'_>) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(&kind)
    }

    fn eat(&mut self, kind: TokenKind<'_>) -> bool {
        if self.at(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: TokenKind<'_>, expected: &'static str) -> ParseResult<()> {
        if self.eat(kind) {
            return Ok(());
        }
        Err(self.unexpected(expected))
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.current().kind {
            self.advance();
            return Ok(name.to_string());
        }
        Err(self.unexpected("identifier"))
    }

    fn unexpected(&self, expected: &'static str) -> TreeBuildError {
        let token = self.current();
        TreeBuildError::UnexpectedToken {
            expected,
            found: format!("{:?}", token.kind),
            line: token.span.line,
            column: token.span.column,
        }
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn augmented_operator(kind: &TokenKind<'_>) -> Option<BinaryOperator> {
    Some(match kind {
        TokenKind::PlusEqual => BinaryOperator::Add,
        TokenKind::MinusEqual => BinaryOperator::Sub,
        TokenKind::StarEqual => BinaryOperator::Mul,
        TokenKind::SlashEqual => BinaryOperator::Div,
        TokenKind::DoubleSlashEqual => BinaryOperator::FloorDiv,
        TokenKind::PercentEqual => BinaryOperator::Mod,
        TokenKind::DoubleStarEqual => BinaryOperator::Pow,
        _ => return None,
    })
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Module> {
    Parser::new(tokens).parse_module()
}

/// Builds the syntax tree of target code.
pub fn parse(source: &str) -> ParseResult<Module> {
    parse_tokens(tokenize(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn name(n: &str) -> Expression {
        Expression::Name(n.to_string())
    }

    #[test]
    fn parses_translator_output() {
        let module = parse("def func (a,b):\n\tif a > b:\n\t\treturn a\n\treturn b")
            .expect("parse should succeed");
        let [Statement::FunctionDef { name: fn_name, params, body }] = module.body.as_slice() else {
            panic!("expected a single function, got {:?}", module.body);
        };
        assert_eq!(fn_name, "func");
        assert_eq!(params, &["a".to_string(), "b".to_string()]);
        assert_eq!(body.len(), 2);
        assert_eq!(body[1], Statement::Return(Some(name("b"))));
    }

    #[test]
    fn parses_precedence() {
        let module = parse("x = a + b * c ** -d\n").expect("parse should succeed");
        let expected = binary(
            name("a"),
            BinaryOperator::Add,
            binary(
                name("b"),
                BinaryOperator::Mul,
                binary(
                    name("c"),
                    BinaryOperator::Pow,
                    Expression::UnaryOp {
                        op: UnaryOperator::Neg,
                        operand: Box::new(name("d")),
                    },
                ),
            ),
        );
        assert_eq!(
            module.body,
            vec![Statement::Assign {
                target: AssignTarget::Name("x".into()),
                value: expected,
            }]
        );
    }

    #[test]
    fn parses_comparisons_and_boolean_operators() {
        let module = parse("if x not in s and not(a != c):\n    pass\n").expect("parse");
        let Statement::If { condition, .. } = &module.body[0] else {
            panic!("expected if");
        };
        let Expression::BoolOp { left, op, right } = condition else {
            panic!("expected bool op, got {condition:?}");
        };
        assert_eq!(*op, BoolOperator::And);
        assert!(matches!(
            left.as_ref(),
            Expression::Compare { comparisons, .. } if comparisons[0].0 == CompareOperator::NotIn
        ));
        assert!(matches!(
            right.as_ref(),
            Expression::UnaryOp { op: UnaryOperator::Not, .. }
        ));
    }

    #[test]
    fn parses_displays() {
        let module = parse("a = {1, 2}\nb = {}\nc = [1, 2,]\nd = {'k': 1}\ne = (1,)\n")
            .expect("parse should succeed");
        let values: Vec<&Expression> = module
            .body
            .iter()
            .map(|statement| match statement {
                Statement::Assign { value, .. } => value,
                other => panic!("expected assignment, got {other:?}"),
            })
            .collect();
        assert!(matches!(values[0], Expression::Set(items) if items.len() == 2));
        assert_eq!(values[1], &Expression::Dict(Vec::new()));
        assert!(matches!(values[2], Expression::List(items) if items.len() == 2));
        assert!(matches!(values[3], Expression::Dict(entries) if entries.len() == 1));
        assert!(matches!(values[4], Expression::Tuple(items) if items.len() == 1));
    }

    #[test]
    fn parses_loops_elif_and_augmented_assignment() {
        let input = indoc! {"
            for i in range(0, n):
                total += a[i]
            while True:
                if i < 5: break
                elif i > 9:
                    continue
                else:
                    i = i // 2
        "};
        let module = parse(input).expect("parse should succeed");
        assert_eq!(module.body.len(), 2);
        let Statement::For { body, .. } = &module.body[0] else {
            panic!("expected for loop");
        };
        assert!(matches!(
            &body[0],
            Statement::AugAssign { op: BinaryOperator::Add, .. }
        ));
        let Statement::While { body, .. } = &module.body[1] else {
            panic!("expected while loop");
        };
        let Statement::If {
            then_body,
            else_body,
            ..
        } = &body[0]
        else {
            panic!("expected if");
        };
        assert_eq!(then_body, &vec![Statement::Break]);
        assert!(matches!(&else_body[0], Statement::If { .. }));
    }

    #[test]
    fn subscript_and_attribute_targets() {
        let module = parse("a[i] = 1\nobj.x = 2\n").expect("parse should succeed");
        assert!(matches!(
            &module.body[0],
            Statement::Assign { target: AssignTarget::Index { .. }, .. }
        ));
        assert!(matches!(
            &module.body[1],
            Statement::Assign { target: AssignTarget::Attribute { name, .. }, .. } if name == "x"
        ));
    }

    #[test]
    fn reports_unexpected_token() {
        let err = parse("x = (1 + \n").expect_err("expected failure");
        assert!(matches!(err, TreeBuildError::Lex(LexError::UnbalancedBracket { .. }) | TreeBuildError::UnexpectedToken { .. }));

        let err = parse("def f(:\n    pass\n").expect_err("expected failure");
        assert_eq!(
            err,
            TreeBuildError::UnexpectedToken {
                expected: "identifier",
                found: "Colon".into(),
                line: 1,
                column: 6,
            }
        );
    }

    #[test]
    fn rejects_invalid_assignment_target() {
        let err = parse("f(x) = 3\n").expect_err("expected failure");
        assert_eq!(err, TreeBuildError::InvalidTarget { line: 1, column: 0 });
    }

    #[test]
    fn lexical_errors_propagate() {
        let err = parse("x = 1 $ 2\n").expect_err("expected failure");
        assert!(matches!(err, TreeBuildError::Lex(LexError::UnexpectedCharacter { .. })));
    }
}

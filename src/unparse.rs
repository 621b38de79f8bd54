//! Prints syntax trees back to target source text.

use std::fmt::Write;

use crate::ast::{
    AssignTarget, BinaryOperator, BoolOperator, Expression, Module, Statement, UnaryOperator,
};

const INDENT: &str = "    ";

pub fn unparse(module: &Module) -> String {
    let mut out = String::new();
    write_block(&mut out, &module.body, 0);
    out
}

pub fn unparse_expression(expression: &Expression) -> String {
    let mut out = String::new();
    write_expression(&mut out, expression);
    out
}

fn write_block(out: &mut String, body: &[Statement], depth: usize) {
    if body.is_empty() {
        line(out, depth, "pass");
        return;
    }
    for statement in body {
        write_statement(out, statement, depth);
    }
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn write_statement(out: &mut String, statement: &Statement, depth: usize) {
    match statement {
        Statement::FunctionDef { name, params, body } => {
            line(out, depth, &format!("def {name}({}):", params.join(", ")));
            write_block(out, body, depth + 1);
        }
        Statement::Assign { target, value } => {
            let text = format!("{} = {}", target_text(target), unparse_expression(value));
            line(out, depth, &text);
        }
        Statement::AugAssign { target, op, value } => {
            let text = format!(
                "{} {}= {}",
                target_text(target),
                op.symbol(),
                unparse_expression(value)
            );
            line(out, depth, &text);
        }
        Statement::While { condition, body } => {
            line(out, depth, &format!("while {}:", unparse_expression(condition)));
            write_block(out, body, depth + 1);
        }
        Statement::For {
            target,
            iterable,
            body,
        } => {
            let text = format!("for {target} in {}:", unparse_expression(iterable));
            line(out, depth, &text);
            write_block(out, body, depth + 1);
        }
        Statement::If { .. } => write_if(out, statement, depth, "if"),
        Statement::Return(None) => line(out, depth, "return"),
        Statement::Return(Some(value)) => {
            line(out, depth, &format!("return {}", unparse_expression(value)));
        }
        Statement::Break => line(out, depth, "break"),
        Statement::Continue => line(out, depth, "continue"),
        Statement::Pass => line(out, depth, "pass"),
        Statement::Expr(value) => line(out, depth, &unparse_expression(value)),
    }
}

fn write_if(out: &mut String, statement: &Statement, depth: usize, keyword: &str) {
    let Statement::If {
        condition,
        then_body,
        else_body,
    } = statement
    else {
        return;
    };
    line(
        out,
        depth,
        &format!("{keyword} {}:", unparse_expression(condition)),
    );
    write_block(out, then_body, depth + 1);
    match else_body.as_slice() {
        [] => {}
        [nested @ Statement::If { .. }] => write_if(out, nested, depth, "elif"),
        _ => {
            line(out, depth, "else:");
            write_block(out, else_body, depth + 1);
        }
    }
}

fn target_text(target: &AssignTarget) -> String {
    let mut out = String::new();
    match target {
        AssignTarget::Name(name) => out.push_str(name),
        AssignTarget::Index { object, index } => {
            write_operand(&mut out, object, Precedence::Postfix);
            out.push('[');
            write_expression(&mut out, index);
            out.push(']');
        }
        AssignTarget::Attribute { object, name } => {
            write_operand(&mut out, object, Precedence::Postfix);
            let _ = write!(out, ".{name}");
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Tuple,
    Or,
    And,
    Not,
    Compare,
    Additive,
    Multiplicative,
    Unary,
    Power,
    Postfix,
}

fn precedence(expression: &Expression) -> Precedence {
    match expression {
        Expression::Tuple(_) => Precedence::Tuple,
        Expression::BoolOp {
            op: BoolOperator::Or,
            ..
        } => Precedence::Or,
        Expression::BoolOp {
            op: BoolOperator::And,
            ..
        } => Precedence::And,
        Expression::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => Precedence::Not,
        Expression::Compare { .. } => Precedence::Compare,
        Expression::BinaryOp { op, .. } => binary_precedence(*op),
        Expression::UnaryOp { .. } => Precedence::Unary,
        _ => Precedence::Postfix,
    }
}

fn binary_precedence(op: BinaryOperator) -> Precedence {
    match op {
        BinaryOperator::Add | BinaryOperator::Sub => Precedence::Additive,
        BinaryOperator::Pow => Precedence::Power,
        _ => Precedence::Multiplicative,
    }
}

/// Writes `expression`, parenthesized when it binds looser than `minimum`.
fn write_operand(out: &mut String, expression: &Expression, minimum: Precedence) {
    if precedence(expression) < minimum {
        out.push('(');
        write_expression(out, expression);
        out.push(')');
    } else {
        write_expression(out, expression);
    }
}

fn write_items(out: &mut String, items: &[Expression]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_operand(out, item, Precedence::Or);
    }
}

fn write_expression(out: &mut String, expression: &Expression) {
    match expression {
        Expression::Integer(digits) => out.push_str(digits),
        Expression::Float(value) => {
            let _ = write!(out, "{value:?}");
        }
        Expression::String(text) => {
            let quote = if text.contains('\'') && !text.contains('"') {
                '"'
            } else {
                '\''
            };
            let _ = write!(out, "{quote}{text}{quote}");
        }
        Expression::Boolean(true) => out.push_str("True"),
        Expression::Boolean(false) => out.push_str("False"),
        Expression::NoneLiteral => out.push_str("None"),
        Expression::Name(name) => out.push_str(name),
        Expression::List(items) => {
            out.push('[');
            write_items(out, items);
            out.push(']');
        }
        Expression::Tuple(items) => {
            out.push('(');
            write_items(out, items);
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Expression::Set(items) => {
            out.push('{');
            write_items(out, items);
            out.push('}');
        }
        Expression::Dict(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_operand(out, key, Precedence::Or);
                out.push_str(": ");
                write_operand(out, value, Precedence::Or);
            }
            out.push('}');
        }
        Expression::Subscript { object, index } => {
            write_operand(out, object, Precedence::Postfix);
            out.push('[');
            write_expression(out, index);
            out.push(']');
        }
        Expression::Attribute { object, name } => {
            write_operand(out, object, Precedence::Postfix);
            out.push('.');
            out.push_str(name);
        }
        Expression::BinaryOp { left, op, right } => {
            let own = binary_precedence(*op);
            if *op == BinaryOperator::Pow {
                write_operand(out, left, Precedence::Postfix);
                let _ = write!(out, " {} ", op.symbol());
                write_operand(out, right, Precedence::Unary);
            } else {
                write_operand(out, left, own);
                let _ = write!(out, " {} ", op.symbol());
                write_strict_operand(out, right, own);
            }
        }
        Expression::UnaryOp { op, operand } => match op {
            UnaryOperator::Not => {
                out.push_str("not ");
                write_operand(out, operand, Precedence::Not);
            }
            UnaryOperator::Neg => {
                out.push('-');
                write_operand(out, operand, Precedence::Unary);
            }
            UnaryOperator::Pos => {
                out.push('+');
                write_operand(out, operand, Precedence::Unary);
            }
        },
        Expression::BoolOp { left, op, right } => {
            let own = precedence(expression);
            let keyword = match op {
                BoolOperator::And => "and",
                BoolOperator::Or => "or",
            };
            write_operand(out, left, own);
            let _ = write!(out, " {keyword} ");
            write_strict_operand(out, right, own);
        }
        Expression::Compare { left, comparisons } => {
            write_strict_operand(out, left, Precedence::Compare);
            for (op, right) in comparisons {
                let _ = write!(out, " {} ", op.symbol());
                write_strict_operand(out, right, Precedence::Compare);
            }
        }
        Expression::Call { callee, args } => {
            write_operand(out, callee, Precedence::Postfix);
            out.push('(');
            write_items(out, args);
            out.push(')');
        }
    }
}

/// Like [`write_operand`] but also parenthesizes operands binding exactly as
/// tight as `level`, preserving left-associative grouping.
fn write_strict_operand(out: &mut String, expression: &Expression, level: Precedence) {
    if precedence(expression) <= level {
        out.push('(');
        write_expression(out, expression);
        out.push(')');
    } else {
        write_expression(out, expression);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;

    fn round_trip(source: &str) -> String {
        unparse(&parse(source).expect("parse should succeed"))
    }

    #[test]
    fn reprints_statements_with_four_space_indent() {
        let source = "def func (a,b):\n\tif a > b:\n\t\treturn a\n\telse:\n\t\tb += 1\n\treturn b";
        assert_eq!(
            round_trip(source),
            indoc! {"
                def func(a, b):
                    if a > b:
                        return a
                    else:
                        b += 1
                    return b
            "}
        );
    }

    #[test]
    fn keeps_grouping() {
        assert_eq!(round_trip("x = (a + b) * c\n"), "x = (a + b) * c\n");
        assert_eq!(round_trip("x = a - (b - c)\n"), "x = a - (b - c)\n");
        assert_eq!(round_trip("x = a - b - c\n"), "x = a - b - c\n");
        assert_eq!(round_trip("x = (-2) ** 2\n"), "x = (-2) ** 2\n");
        assert_eq!(round_trip("x = 2 ** 3 ** 2\n"), "x = 2 ** 3 ** 2\n");
        assert_eq!(
            round_trip("if a > 3 or not(a != c):\n\tpass\n"),
            "if a > 3 or not a != c:\n    pass\n"
        );
    }

    #[test]
    fn reprints_elif_chains_and_literals() {
        let source = indoc! {"
            if x in {1, 2}:
                y = [1.5, 'it', None]
            elif x is not None:
                y = (1,)
            else:
                y = {'k': True}
        "};
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn reprints_integers_verbatim() {
        assert_eq!(
            round_trip("x = 123456789012345678901234567890 + 1_000\n"),
            "x = 123456789012345678901234567890 + 1_000\n"
        );
    }

    #[test]
    fn reprinted_source_parses_to_the_same_tree() {
        let source = "def f(n):\n\tif n < 2:\n\t\treturn n\n\treturn f(n - 1) + f(n - 2)\nx = f(10)";
        let tree = parse(source).expect("parse should succeed");
        let reparsed = parse(&unparse(&tree)).expect("reparse should succeed");
        assert_eq!(tree, reparsed);
    }
}

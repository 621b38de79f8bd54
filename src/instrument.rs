//! Value-tracking instrumentation for the repeat-values detector.
//!
//! Every plain-name assignment is followed by a call to a recording routine
//! defined in [`PRELUDE`]. When a variable receives a value equal (`==`) to
//! one it held before, the routine writes `1` to [`REPEAT_ARTIFACT`] in the
//! working directory.

use crate::ast::{Expression, Module, Statement};
use crate::unparse::unparse;

pub const RECORD_FUNCTION: &str = "_algoscope_record";
pub const REPEAT_ARTIFACT: &str = "repeat.flag";

pub const PRELUDE: &str = "\
_algoscope_history = {}


def _algoscope_record(name, value):
    seen = _algoscope_history.setdefault(name, [])
    for earlier in seen:
        if earlier == value:
            handle = open('repeat.flag', 'w')
            handle.write('1')
            handle.close()
            return
    seen.append(value)


";

/// Returns a copy of `module` with a record call after each plain-name
/// assignment. Blocks that already contain a record call are left alone.
pub fn instrument(module: &Module) -> Module {
    Module {
        body: instrument_block(&module.body),
    }
}

/// Prelude followed by the instrumented program, ready to run.
pub fn instrumented_program(module: &Module) -> String {
    let mut program = String::from(PRELUDE);
    program.push_str(&unparse(&instrument(module)));
    program
}

fn instrument_block(block: &[Statement]) -> Vec<Statement> {
    let already_instrumented = block.iter().any(is_record_call);
    let mut out = Vec::with_capacity(block.len() * 2);
    for statement in block {
        out.push(instrument_nested(statement));
        if already_instrumented {
            continue;
        }
        if let Some(name) = statement.assigned_name() {
            out.push(record_call(name));
        }
    }
    out
}

fn instrument_nested(statement: &Statement) -> Statement {
    match statement {
        Statement::FunctionDef { name, params, body } => Statement::FunctionDef {
            name: name.clone(),
            params: params.clone(),
            body: instrument_block(body),
        },
        Statement::While { condition, body } => Statement::While {
            condition: condition.clone(),
            body: instrument_block(body),
        },
        Statement::For {
            target,
            iterable,
            body,
        } => Statement::For {
            target: target.clone(),
            iterable: iterable.clone(),
            body: instrument_block(body),
        },
        Statement::If {
            condition,
            then_body,
            else_body,
        } => Statement::If {
            condition: condition.clone(),
            then_body: instrument_block(then_body),
            else_body: instrument_block(else_body),
        },
        other => other.clone(),
    }
}

fn record_call(name: &str) -> Statement {
    Statement::Expr(Expression::Call {
        callee: Box::new(Expression::Name(RECORD_FUNCTION.to_string())),
        args: vec![
            Expression::String(name.to_string()),
            Expression::Name(name.to_string()),
        ],
    })
}

fn is_record_call(statement: &Statement) -> bool {
    matches!(statement, Statement::Expr(call) if call.call_name() == Some(RECORD_FUNCTION))
}

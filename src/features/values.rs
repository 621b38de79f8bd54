use rustc_hash::FxHashSet;

use crate::ast::{AssignTarget, Expression, Module, Node, Statement};

use super::{body_nodes, distinct_functions};

/// 1 when any list or set display appears, else 0.
pub fn using_non_scalar(module: &Module) -> u8 {
    let found = module.walk().filter_map(Node::expression).any(|expression| {
        matches!(expression, Expression::List(_) | Expression::Set(_))
    });
    u8::from(found)
}

/// 1 when a loop updates a variable from its own value, or a recursive
/// function does so and passes the variable to its self-call, else 0.
pub fn reuse_values(module: &Module) -> u8 {
    let in_loop = module
        .walk()
        .filter_map(Node::statement)
        .filter_map(|statement| match statement {
            Statement::While { body, .. } | Statement::For { body, .. } => Some(body),
            _ => None,
        })
        .any(|body| !self_updated_names(body).is_empty());
    if in_loop {
        return 1;
    }

    let in_recursion = distinct_functions(module).into_iter().any(|function| {
        let updated = self_updated_names(function.body);
        !updated.is_empty()
            && function.recursive_calls().any(|args| {
                args.iter()
                    .any(|arg| arg.name().is_some_and(|name| updated.contains(name)))
            })
    });
    u8::from(in_recursion)
}

/// Names assigned from an expression that mentions them, as in `x = x + 1`.
fn self_updated_names(body: &[Statement]) -> FxHashSet<&str> {
    body_nodes(body)
        .filter_map(Node::statement)
        .filter_map(|statement| match statement {
            Statement::Assign {
                target: AssignTarget::Name(name),
                value,
            } if value.mentions(name) => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

use rustc_hash::FxHashSet;

use crate::ast::{AssignTarget, Expression, Module, Node, Statement};

use super::{clamp, exit_conditions};

/// 1 when a loop's iteration source or exit condition is tied to a
/// collection, else 0.
///
/// Collection names are those assigned a list or set display earlier in
/// document order. A display written directly in the loop header does not
/// count.
pub fn loop_n_depend(module: &Module) -> u8 {
    let mut collections: FxHashSet<&str> = FxHashSet::default();
    for statement in module.walk().filter_map(Node::statement) {
        match statement {
            Statement::Assign {
                target: AssignTarget::Name(name),
                value,
            } if is_collection_display(value) => {
                collections.insert(name);
            }
            Statement::For { iterable, .. } => {
                if is_collection_name(iterable, &collections) {
                    return 1;
                }
            }
            Statement::While { .. } => {
                let tied = exit_conditions(statement).into_iter().any(|condition| {
                    compared_operands(condition)
                        .any(|operand| depends_on_collection(operand, &collections))
                });
                if tied {
                    return 1;
                }
            }
            _ => {}
        }
    }
    0
}

fn is_collection_display(expression: &Expression) -> bool {
    matches!(expression, Expression::List(_) | Expression::Set(_))
}

fn is_collection_name(expression: &Expression, collections: &FxHashSet<&str>) -> bool {
    expression
        .name()
        .is_some_and(|name| collections.contains(name))
}

/// `name`, `name[...]` or `len(name)` for a collection name.
fn depends_on_collection(operand: &Expression, collections: &FxHashSet<&str>) -> bool {
    match operand {
        Expression::Subscript { object, .. } => is_collection_name(object, collections),
        Expression::Call { args, .. } if operand.call_name() == Some("len") => {
            matches!(args.as_slice(), [arg] if is_collection_name(arg, collections))
        }
        _ => is_collection_name(operand, collections),
    }
}

/// Operands of every comparison inside `condition`.
fn compared_operands(condition: &Expression) -> impl Iterator<Item = &Expression> {
    Node::Expression(condition)
        .walk()
        .filter_map(Node::expression)
        .flat_map(|expression| match expression {
            Expression::Compare { left, comparisons } => std::iter::once(left.as_ref())
                .chain(comparisons.iter().map(|(_, right)| right))
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
}

/// Deepest chain of loops nested inside one another; sibling loops do not stack.
pub fn loop_nested(module: &Module) -> u8 {
    clamp(nesting_depth(Node::Module(module)))
}

fn nesting_depth(node: Node<'_>) -> usize {
    let inner = node
        .children()
        .into_iter()
        .map(nesting_depth)
        .max()
        .unwrap_or(0);
    if node.statement().is_some_and(Statement::is_loop) {
        inner + 1
    } else {
        inner
    }
}

/// 0 without loops, 1 for only `for` loops, 2 once any `while` loop appears.
pub fn loop_type(module: &Module) -> u8 {
    let mut loop_type = 0;
    for statement in module.walk().filter_map(Node::statement) {
        match statement {
            Statement::While { .. } => return 2,
            Statement::For { .. } => loop_type = 1,
            _ => {}
        }
    }
    loop_type
}

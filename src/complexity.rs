//! Ordinal complexity classification over the syntax tree and its features.

use std::fmt;

use serde::Serialize;

use crate::ast::{AssignTarget, Expression, Module, Node, Statement};
use crate::features::{
    Features, Function, body_nodes, distinct_functions, exit_conditions, is_counting_loop,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub enum ComplexityClass {
    Constant = 0,
    Logarithmic = 1,
    Linear = 2,
    Polynomial = 3,
    Exponential = 4,
}

impl ComplexityClass {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            ComplexityClass::Constant => "O(c)",
            ComplexityClass::Logarithmic => "O(log(n))",
            ComplexityClass::Linear => "O(n)",
            ComplexityClass::Polynomial => "O(n^c)",
            ComplexityClass::Exponential => "O(c^n)",
        }
    }
}

impl From<ComplexityClass> for u8 {
    fn from(class: ComplexityClass) -> Self {
        class.as_u8()
    }
}

impl fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies `module` given its already extracted features.
///
/// Rules run in priority order. Non-termination and non-converging
/// recursion return immediately; every other rule only raises the class.
pub fn classify(module: &Module, features: &Features) -> ComplexityClass {
    if features.prog_terminate == 1 {
        return ComplexityClass::Exponential;
    }

    let mut class = ComplexityClass::Constant;
    let recursive: Vec<Function<'_>> = distinct_functions(module)
        .into_iter()
        .filter(|function| function.recursive_calls().next().is_some())
        .collect();
    if !recursive.is_empty() {
        if !recursive.iter().all(|function| converges(*function)) {
            return ComplexityClass::Exponential;
        }
        class = ComplexityClass::Polynomial;
    }

    let loops: Vec<&Statement> = module
        .walk()
        .filter_map(Node::statement)
        .filter(|statement| statement.is_loop())
        .collect();
    let logarithmic: Vec<&Statement> = loops
        .iter()
        .copied()
        .filter(|statement| is_logarithmic(statement))
        .collect();
    if !logarithmic.is_empty() {
        class = class.max(ComplexityClass::Logarithmic);
    }

    if features.loop_nested > 0 && class != ComplexityClass::Logarithmic {
        class = class.max(ComplexityClass::Linear);
    }
    if features.loop_nested > 1 {
        class = class.max(ComplexityClass::Polynomial);
    }

    let unbounded = loops.iter().any(|statement| match statement {
        Statement::For { .. } => !is_counting_loop(statement),
        Statement::While { .. } => {
            features.loop_n_depend == 0
                && !logarithmic
                    .iter()
                    .any(|candidate| std::ptr::eq(*candidate, *statement))
        }
        _ => false,
    });
    if unbounded {
        class = ComplexityClass::Exponential;
    }

    tracing::debug!(class = class.label(), "complexity classified");
    class
}

/// Every self-call divides one of the function's parameters.
fn converges(function: Function<'_>) -> bool {
    function.recursive_calls().all(|args| {
        args.iter().any(|arg| {
            Node::Expression(arg)
                .walk()
                .filter_map(Node::expression)
                .any(|expression| match expression {
                    Expression::BinaryOp { left, op, .. } if op.is_division() => function
                        .params
                        .iter()
                        .any(|param| left.mentions(param)),
                    _ => false,
                })
        })
    })
}

/// A while loop whose exit condition compares a variable that the body
/// divides, as in `i = i / 2`.
fn is_logarithmic(statement: &Statement) -> bool {
    let Statement::While { body, .. } = statement else {
        return false;
    };
    let tracked: Vec<&str> = exit_conditions(statement)
        .into_iter()
        .flat_map(compared_names)
        .collect();
    if tracked.is_empty() {
        return false;
    }
    body_nodes(body)
        .filter_map(Node::statement)
        .any(|inner| match inner {
            Statement::Assign {
                target: AssignTarget::Name(name),
                value: Expression::BinaryOp { left, op, .. },
            } => {
                op.is_division()
                    && left.name() == Some(name.as_str())
                    && tracked.contains(&name.as_str())
            }
            Statement::AugAssign {
                target: AssignTarget::Name(name),
                op,
                ..
            } => op.is_division() && tracked.contains(&name.as_str()),
            _ => false,
        })
}

/// Plain names used directly as comparison operands.
fn compared_names(condition: &Expression) -> Vec<&str> {
    Node::Expression(condition)
        .walk()
        .filter_map(Node::expression)
        .flat_map(|expression| match expression {
            Expression::Compare { left, comparisons } => std::iter::once(left.as_ref())
                .chain(comparisons.iter().map(|(_, right)| right))
                .filter_map(Expression::name)
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{loop_n_depend, loop_nested};
    use crate::parser::parse;
    use indoc::indoc;

    /// Classifies with the static features computed and a terminating run.
    fn class_of(source: &str) -> ComplexityClass {
        let module = parse(source).expect("parse should succeed");
        let features = Features {
            loop_nested: loop_nested(&module),
            loop_n_depend: loop_n_depend(&module),
            ..Features::default()
        };
        classify(&module, &features)
    }

    #[test]
    fn labels_match_classifier_surface() {
        assert_eq!(ComplexityClass::Logarithmic.to_string(), "O(log(n))");
        assert_eq!(ComplexityClass::Exponential.as_u8(), 4);
    }

    #[test]
    fn straight_line_code_is_constant() {
        assert_eq!(class_of("a = 3\nb = 2\n"), ComplexityClass::Constant);
    }

    #[test]
    fn halving_loop_is_logarithmic() {
        let source = indoc! {"
            i = 10
            while True:
                i = i / 2
                if i < 5:
                    break
        "};
        assert_eq!(class_of(source), ComplexityClass::Logarithmic);
        assert_eq!(
            class_of("n = 64\nwhile n > 1:\n    n //= 2\n"),
            ComplexityClass::Logarithmic
        );
    }

    #[test]
    fn single_loops_are_linear() {
        assert_eq!(
            class_of("for i in range(1, 10, 1):\n    a = i\n"),
            ComplexityClass::Linear
        );
        let source = indoc! {"
            a = [1, 2, 3]
            i = 0
            while True:
                if a[i] > 2:
                    break
                i = i+1
        "};
        assert_eq!(class_of(source), ComplexityClass::Linear);
    }

    #[test]
    fn nested_loops_and_dividing_recursion_are_polynomial() {
        let nested = indoc! {"
            a = [1,2,3]
            for i in range(0,10,1):
                for j in range(0,10,1):
                    a = a + [i]
        "};
        assert_eq!(class_of(nested), ComplexityClass::Polynomial);

        let dividing = indoc! {"
            def func(a):
                if a == 1:
                    return a
                return func(a/3)

            func(3)
        "};
        assert_eq!(class_of(dividing), ComplexityClass::Polynomial);
    }

    #[test]
    fn recursion_keeps_polynomial_floor_with_a_single_loop() {
        let source = indoc! {"
            def search(lo, hi):
                if hi - lo < 2:
                    return lo
                return search(lo, (lo + hi) // 2)

            for k in range(0, 4):
                search(0, k)
        "};
        assert_eq!(class_of(source), ComplexityClass::Polynomial);
    }

    #[test]
    fn unbounded_work_is_exponential() {
        let shrinking = indoc! {"
            def func(a):
                if a > 3:
                    return a
                return func(a-1)
        "};
        assert_eq!(class_of(shrinking), ComplexityClass::Exponential);

        assert_eq!(
            class_of("a = {1, 2, 3}\nfor i in a:\n    j = i\n"),
            ComplexityClass::Exponential
        );

        let counter = indoc! {"
            i = 0
            while True:
                i = i+1
                if i < 10:
                    break
            i = i / 10
        "};
        assert_eq!(class_of(counter), ComplexityClass::Exponential);

        let mixed = indoc! {"
            for i in range(1, 10, 1):
                a = i
                j = 0
                while True:
                    a = j
                    j += 1
                    if j < 9:
                        break
        "};
        assert_eq!(class_of(mixed), ComplexityClass::Exponential);
    }

    #[test]
    fn non_termination_short_circuits() {
        let module = parse("a = 1\n").expect("parse should succeed");
        let features = Features {
            prog_terminate: 1,
            ..Features::default()
        };
        assert_eq!(classify(&module, &features), ComplexityClass::Exponential);
    }
}

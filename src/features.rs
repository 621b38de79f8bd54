//! Structural feature detectors and the memoized extractor.
//!
//! Six detectors are pure functions over a [`Module`]; repeat-values and
//! termination execute the program through a [`ProgramRunner`].

mod dynamic;
mod loops;
mod recursion;
mod values;

pub use dynamic::{prog_terminate, repeat_values};
pub use loops::{loop_n_depend, loop_nested, loop_type};
pub use recursion::rec_count;
pub use values::{reuse_values, using_non_scalar};

use serde::Serialize;

use crate::ast::{Expression, Module, Node, Statement};
use crate::complexity::{ComplexityClass, classify};
use crate::sandbox::ProgramRunner;

/// The eight detector results, each a small non-negative integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Features {
    pub rec_count: u8,
    pub loop_n_depend: u8,
    pub loop_nested: u8,
    pub loop_type: u8,
    pub prog_terminate: u8,
    pub using_non_scalar: u8,
    pub repeat_values: u8,
    pub reuse_values: u8,
}

/// Features plus the complexity class, in classifier input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureVector {
    #[serde(flatten)]
    pub features: Features,
    pub complexity: ComplexityClass,
}

impl FeatureVector {
    pub fn as_array(&self) -> [u8; 9] {
        let f = &self.features;
        [
            f.rec_count,
            f.loop_n_depend,
            f.loop_nested,
            f.loop_type,
            f.prog_terminate,
            f.using_non_scalar,
            f.repeat_values,
            f.reuse_values,
            self.complexity.as_u8(),
        ]
    }
}

/// Computes features of one tree at most once.
pub struct FeatureExtractor<'a> {
    module: &'a Module,
    runner: &'a dyn ProgramRunner,
    features: Option<Features>,
    complexity: Option<ComplexityClass>,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(module: &'a Module, runner: &'a dyn ProgramRunner) -> Self {
        Self {
            module,
            runner,
            features: None,
            complexity: None,
        }
    }

    pub async fn features(&mut self) -> Features {
        if let Some(features) = self.features {
            return features;
        }
        let module = self.module;
        let (repeat_values, prog_terminate) = tokio::join!(
            repeat_values(module, self.runner),
            prog_terminate(module, self.runner),
        );
        let features = Features {
            rec_count: rec_count(module),
            loop_n_depend: loop_n_depend(module),
            loop_nested: loop_nested(module),
            loop_type: loop_type(module),
            prog_terminate,
            using_non_scalar: using_non_scalar(module),
            repeat_values,
            reuse_values: reuse_values(module),
        };
        tracing::debug!(?features, "features extracted");
        self.features = Some(features);
        features
    }

    pub async fn complexity(&mut self) -> ComplexityClass {
        if let Some(class) = self.complexity {
            return class;
        }
        let features = self.features().await;
        let class = classify(self.module, &features);
        self.complexity = Some(class);
        class
    }

    pub async fn feature_vector(&mut self) -> FeatureVector {
        let complexity = self.complexity().await;
        FeatureVector {
            features: self.features().await,
            complexity,
        }
    }
}

/// A function definition as seen by the detectors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Function<'a> {
    pub name: &'a str,
    pub params: &'a [String],
    pub body: &'a [Statement],
}

impl<'a> Function<'a> {
    /// Calls to the function itself anywhere in its body.
    pub fn recursive_calls(self) -> impl Iterator<Item = &'a [Expression]> {
        body_nodes(self.body)
            .filter_map(Node::expression)
            .filter_map(move |expression| match expression {
                Expression::Call { callee, args } if callee.name() == Some(self.name) => {
                    Some(args.as_slice())
                }
                _ => None,
            })
    }
}

/// Each distinct function name once, at its first definition in document order.
pub(crate) fn distinct_functions(module: &Module) -> Vec<Function<'_>> {
    let mut functions: Vec<Function<'_>> = Vec::new();
    for statement in module.walk().filter_map(Node::statement) {
        if let Statement::FunctionDef { name, params, body } = statement
            && !functions.iter().any(|function| function.name == name)
        {
            functions.push(Function { name, params, body });
        }
    }
    functions
}

/// Pre-order traversal of every node below `body`.
pub(crate) fn body_nodes(body: &[Statement]) -> impl Iterator<Item = Node<'_>> {
    body.iter().flat_map(|statement| Node::Statement(statement).walk())
}

pub(crate) fn contains_break(statement: &Statement) -> bool {
    Node::Statement(statement)
        .walk()
        .any(|node| matches!(node, Node::Statement(Statement::Break)))
}

/// Test of the first `if` inside a while loop whose subtree contains `break`.
pub(crate) fn break_condition(statement: &Statement) -> Option<&Expression> {
    let Statement::While { body, .. } = statement else {
        return None;
    };
    body_nodes(body)
        .filter_map(Node::statement)
        .find_map(|inner| match inner {
            Statement::If { condition, .. } if contains_break(inner) => Some(condition),
            _ => None,
        })
}

/// Conditions that can end a while loop: its break condition and its own
/// test unless that is the literal `True`.
pub(crate) fn exit_conditions(statement: &Statement) -> Vec<&Expression> {
    let mut conditions = Vec::new();
    if let Statement::While { condition, .. } = statement
        && *condition != Expression::Boolean(true)
    {
        conditions.push(condition);
    }
    conditions.extend(break_condition(statement));
    conditions
}

pub(crate) fn is_counting_loop(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::For { iterable, .. } if iterable.call_name() == Some("range")
    )
}

pub(crate) fn clamp(value: usize) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

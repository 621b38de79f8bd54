use crate::ast::Module;

use super::{clamp, distinct_functions};

/// Highest number of self-calls inside a single function body.
///
/// Counts are per function and never summed across functions.
pub fn rec_count(module: &Module) -> u8 {
    let most = distinct_functions(module)
        .into_iter()
        .map(|function| function.recursive_calls().count())
        .max()
        .unwrap_or(0);
    clamp(most)
}

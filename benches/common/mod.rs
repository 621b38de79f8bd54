use std::path::Path;

use algoscope::pseudo;

/// Fixture cases flagged for benchmarking, as `(label, pseudocode)`.
pub fn workloads() -> Vec<(String, String)> {
    let cases = test_support::load_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load cases: {err:#}"));
    cases
        .into_iter()
        .filter(|case| case.spec.bench)
        .map(|case| {
            let source = case
                .source()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn translated(label: &str, source: &str) -> String {
    pseudo::translate(source)
        .code
        .unwrap_or_else(|| panic!("translate {label}: no code"))
}

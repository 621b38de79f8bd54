use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseClass {
    Translated,
    SyntaxError,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ExpectedFeatures {
    pub rec_count: Option<u8>,
    pub loop_n_depend: Option<u8>,
    pub loop_nested: Option<u8>,
    pub loop_type: Option<u8>,
    pub reuse_values: Option<u8>,
    pub using_non_scalar: Option<u8>,
    pub repeat_values: Option<u8>,
    pub prog_terminate: Option<u8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpectedOutcome {
    pub code_file: Option<String>,
    pub complexity: Option<u8>,
    #[serde(default)]
    pub features: ExpectedFeatures,
    pub error_contains: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaseSpec {
    pub class: CaseClass,
    /// Included in the frontend benchmark workloads.
    #[serde(default)]
    pub bench: bool,
    pub expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub dir: PathBuf,
    pub program_path: PathBuf,
    pub spec: CaseSpec,
}

impl Case {
    pub fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }

    pub fn source(&self) -> Result<String> {
        fs::read_to_string(&self.program_path)
            .with_context(|| format!("Reading {}", self.program_path.display()))
    }
}

/// Loads every `<case>/{program.ps, case.yaml}` directory under `programs_dir`.
pub fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let mut cases = Vec::new();

    for entry in
        fs::read_dir(programs_dir).with_context(|| format!("Reading {}", programs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let case_path = path.join("case.yaml");
        if !case_path.exists() {
            continue;
        }

        let program_path = path.join("program.ps");
        ensure!(
            program_path.exists(),
            "Missing program.ps for case {}",
            path.display()
        );

        let case_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", path.display()))?;
        let case_raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec: CaseSpec = serde_yaml::from_str(&case_raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        cases.push(Case {
            name: case_name,
            dir: path,
            program_path,
            spec,
        });
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        programs_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}

pub fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

pub fn detect_python_interpreter() -> Option<String> {
    if let Ok(python) = std::env::var("PYTHON")
        && run_python_startup(&python).is_ok()
    {
        return Some(python);
    }

    run_python_startup("python3")
        .is_ok()
        .then(|| "python3".to_string())
}

/// `PYTHON_REQUIRED=1` turns a missing interpreter into a test failure.
pub fn python_required() -> bool {
    std::env::var("PYTHON_REQUIRED")
        .map(|value| value == "1")
        .unwrap_or(false)
}

pub fn run_python_startup(interpreter: &str) -> Result<()> {
    let status = Command::new(interpreter)
        .arg("-c")
        .arg("pass")
        .status()
        .with_context(|| format!("Running '{interpreter} -c pass'"))?;
    ensure!(status.success(), "python startup command failed");
    Ok(())
}

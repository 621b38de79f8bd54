//! End-to-end pipeline: pseudocode to target code to feature vector.

use serde::Serialize;
use thiserror::Error;

use crate::complexity::ComplexityClass;
use crate::config::AnalyzerConfig;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::parser::{self, TreeBuildError};
use crate::pseudo::{self, Diagnostic, DiagnosticKind, ParseResult};
use crate::sandbox::{ProgramRunner, SandboxRunner};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Translation failed: {}", describe(diagnostics))]
    Translation { diagnostics: Vec<Diagnostic> },
    #[error(transparent)]
    TreeBuild(#[from] TreeBuildError),
}

fn describe(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "no statements".to_string();
    }
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of analysing one program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub code: String,
    /// Lexical warnings that did not prevent translation.
    pub diagnostics: Vec<Diagnostic>,
    pub features: FeatureVector,
    pub complexity: &'static str,
}

impl Analysis {
    pub fn class(&self) -> ComplexityClass {
        self.features.complexity
    }
}

pub struct Analyzer {
    runner: Box<dyn ProgramRunner>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_runner(Box::new(SandboxRunner::new(config)))
    }

    pub fn with_runner(runner: Box<dyn ProgramRunner>) -> Self {
        Self { runner }
    }

    /// Translation only. Never executes anything.
    pub fn translate(&self, pseudocode: &str) -> ParseResult {
        let result = pseudo::translate(pseudocode);
        for diagnostic in &result.diagnostics {
            tracing::debug!(kind = ?diagnostic.kind, %diagnostic, "translation diagnostic");
        }
        result
    }

    /// Translates `pseudocode` and analyses the generated code.
    ///
    /// Syntax diagnostics refuse the analysis; lexical ones are carried
    /// along in [`Analysis::diagnostics`].
    pub async fn analyze(&self, pseudocode: &str) -> Result<Analysis, AnalysisError> {
        let ParseResult { code, diagnostics } = self.translate(pseudocode);
        let has_syntax_errors = diagnostics
            .iter()
            .any(|diagnostic| diagnostic.kind == DiagnosticKind::Syntax);
        let code = match code {
            Some(code) if !has_syntax_errors => code,
            _ => return Err(AnalysisError::Translation { diagnostics }),
        };
        let mut analysis = self.analyze_code(&code).await?;
        analysis.diagnostics = diagnostics;
        Ok(analysis)
    }

    /// Analyses target code directly, skipping translation.
    pub async fn analyze_code(&self, code: &str) -> Result<Analysis, AnalysisError> {
        let module = parser::parse(code)?;
        let mut extractor = FeatureExtractor::new(&module, self.runner.as_ref());
        let features = extractor.feature_vector().await;
        tracing::info!(complexity = features.complexity.label(), "analysis finished");
        Ok(Analysis {
            code: code.to_string(),
            diagnostics: Vec::new(),
            complexity: features.complexity.label(),
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::scripted::ScriptedRunner;
    use crate::sandbox::{ExecutionOutcome, SandboxReport};

    fn scripted(outcome: ExecutionOutcome) -> Analyzer {
        Analyzer::with_runner(Box::new(ScriptedRunner::new(vec![
            Ok(SandboxReport::new(ExecutionOutcome::Completed)),
            Ok(SandboxReport::new(outcome)),
        ])))
    }

    #[tokio::test]
    async fn analyzes_translated_pseudocode() {
        let analyzer = Analyzer::with_runner(Box::new(ScriptedRunner::completing()));
        let analysis = analyzer
            .analyze("for i in 1 to 10 by 1 do a <- 10+i endfor")
            .await
            .expect("analysis should succeed");
        assert_eq!(analysis.code, "for i in range(1,10,1):\n\ta = 10 + i");
        assert_eq!(analysis.class(), ComplexityClass::Linear);
        assert_eq!(analysis.complexity, "O(n)");
        assert_eq!(analysis.features.as_array(), [0, 0, 1, 1, 0, 0, 0, 0, 2]);
    }

    #[tokio::test]
    async fn syntax_diagnostics_refuse_analysis() {
        let analyzer = Analyzer::with_runner(Box::new(ScriptedRunner::completing()));
        let error = analyzer
            .analyze("if a then b <- endif")
            .await
            .expect_err("syntax error should refuse analysis");
        let AnalysisError::Translation { diagnostics } = &error else {
            panic!("expected translation error, got {error:?}");
        };
        assert!(
            diagnostics
                .iter()
                .any(|diagnostic| diagnostic.kind == DiagnosticKind::Syntax)
        );
        assert!(error.to_string().starts_with("Translation failed: syntax error near"));
    }

    #[tokio::test]
    async fn empty_input_is_refused() {
        let analyzer = Analyzer::with_runner(Box::new(ScriptedRunner::completing()));
        let error = analyzer.analyze("").await.expect_err("nothing to analyse");
        assert!(error.to_string().contains("near end of input"));
    }

    #[tokio::test]
    async fn lexical_warnings_are_carried_along() {
        let analyzer = Analyzer::with_runner(Box::new(ScriptedRunner::completing()));
        let analysis = analyzer
            .analyze("a <- 3 $")
            .await
            .expect("lexical diagnostics do not refuse analysis");
        assert_eq!(analysis.code, "a = 3");
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.class(), ComplexityClass::Constant);
    }

    #[tokio::test]
    async fn integer_literals_of_any_length_are_analyzed() {
        let analyzer = Analyzer::with_runner(Box::new(ScriptedRunner::completing()));
        let analysis = analyzer
            .analyze("a <- 99999999999999999999")
            .await
            .expect("wide literal should be analyzed");
        assert_eq!(analysis.code, "a = 99999999999999999999");
        assert_eq!(analysis.class(), ComplexityClass::Constant);
    }

    #[tokio::test]
    async fn target_code_skips_translation() {
        let analyzer = scripted(ExecutionOutcome::TimedOut);
        let analysis = analyzer
            .analyze_code("while True:\n    a = 3\n")
            .await
            .expect("analysis should succeed");
        assert_eq!(analysis.features.features.prog_terminate, 1);
        assert_eq!(analysis.class(), ComplexityClass::Exponential);
    }

    #[tokio::test]
    async fn malformed_target_code_is_a_tree_build_error() {
        let analyzer = Analyzer::with_runner(Box::new(ScriptedRunner::completing()));
        let error = analyzer
            .analyze_code("def f(:\n")
            .await
            .expect_err("tree build should fail");
        assert!(matches!(error, AnalysisError::TreeBuild(_)));
    }

    #[test]
    fn translate_never_runs_programs() {
        let analyzer = Analyzer::with_runner(Box::new(ScriptedRunner::new(Vec::new())));
        let result = analyzer.translate("a <- 3");
        assert!(result.is_clean());
        assert_eq!(result.code.as_deref(), Some("a = 3"));
    }
}

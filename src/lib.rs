pub mod analyzer;
pub mod ast;
pub mod complexity;
pub mod config;
pub mod features;
pub mod instrument;
pub mod lexer;
pub mod parser;
pub mod pseudo;
pub mod sandbox;
pub mod token;
pub mod unparse;

pub use analyzer::{Analysis, AnalysisError, Analyzer};
pub use config::AnalyzerConfig;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use algoscope::analyzer::{Analysis, Analyzer};
use algoscope::config::AnalyzerConfig;

#[derive(Debug, Default)]
struct Options {
    translate_only: bool,
    target: bool,
    yaml: bool,
    config: Option<PathBuf>,
    python: Option<String>,
    timeout_ms: Option<u64>,
    input_path: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--translate-only" | "-t" => options.translate_only = true,
            "--target" => options.target = true,
            "--yaml" => options.yaml = true,
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing path after {arg}"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--python" => {
                options.python = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("Missing interpreter after {arg}"))?,
                );
            }
            "--timeout-ms" => {
                let raw = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing value after {arg}"))?;
                let timeout = raw
                    .parse()
                    .with_context(|| format!("Invalid timeout '{raw}'"))?;
                options.timeout_ms = Some(timeout);
            }
            _ if arg.starts_with('-') && arg != "-" => bail!("Unknown option '{arg}'"),
            _ => {
                if options.input_path.is_some() {
                    bail!("Only one input file is supported");
                }
                options.input_path = Some(arg);
            }
        }
    }

    if options.translate_only && options.target {
        bail!("--translate-only and --target cannot be combined");
    }
    Ok(options)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) if path != "-" => {
            fs::read_to_string(path).with_context(|| format!("Reading {path}"))
        }
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            Ok(buffer)
        }
    }
}

fn load_config(options: &Options) -> Result<AnalyzerConfig> {
    let mut config = AnalyzerConfig::load(options.config.as_deref())?;
    if let Some(python) = &options.python {
        config.python = python.clone();
    }
    if let Some(timeout_ms) = options.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

fn print_analysis(analysis: &Analysis) -> Result<()> {
    println!("{}", analysis.code);
    println!();
    print!("{}", serde_yaml::to_string(&analysis.features)?);
    println!("Label: {}", analysis.complexity);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = parse_args(std::env::args().skip(1))?;
    let source = read_input(options.input_path.as_deref())?;
    let analyzer = Analyzer::new(load_config(&options)?);

    if options.translate_only {
        let result = analyzer.translate(&source);
        for diagnostic in &result.diagnostics {
            eprintln!("{diagnostic}");
        }
        match result.code {
            Some(code) if result.diagnostics.is_empty() => println!("{code}"),
            _ => bail!("Translation failed"),
        }
        return Ok(());
    }

    let analysis = if options.target {
        analyzer.analyze_code(&source).await?
    } else {
        analyzer.analyze(&source).await?
    };
    for diagnostic in &analysis.diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    if options.yaml {
        print!("{}", serde_yaml::to_string(&analysis)?);
    } else {
        print_analysis(&analysis)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_flags_and_input() {
        let options = parse_args(args(&[
            "--timeout-ms",
            "250",
            "--python",
            "pypy3",
            "--yaml",
            "prog.ps",
        ]))
        .expect("valid arguments");
        assert_eq!(options.timeout_ms, Some(250));
        assert_eq!(options.python.as_deref(), Some("pypy3"));
        assert!(options.yaml);
        assert_eq!(options.input_path.as_deref(), Some("prog.ps"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(args(&["--timeout-ms", "soon"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["a.ps", "b.ps"])).is_err());
        assert!(parse_args(args(&["--translate-only", "--target"])).is_err());
    }
}

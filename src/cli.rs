//! Command-line interface for cerrful.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::analyzer::{Analyzer, AnalyzerOptions};
use crate::registry::{Registry, RegistryFile};
use crate::report::Report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VIOLATIONS: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Registry config file names searched in the working directory.
const DEFAULT_CONFIG_NAMES: &[&str] = &["cerrful.yaml", ".cerrful.yaml"];

/// Static analyzer enforcing the CER error-handling discipline for Go code.
///
/// Cerrful keeps every error value owned by exactly one handler: annotated
/// once when it crosses a semantic boundary, and never both logged and
/// returned.
#[derive(Parser)]
#[command(name = "cerrful")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze Go files and report CER violations
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// Print the CIR lowering of one file (debug aid)
    Cir(CirArgs),
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Path to analyze (file or directory)
    pub path: PathBuf,

    /// Path to a registry config YAML (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Live-frame budget for path-sensitive tracking
    #[arg(long, default_value_t = 256)]
    pub fork_budget: usize,

    /// Disable per-function parallelism
    #[arg(long)]
    pub sequential: bool,
}

/// Arguments for the cir command.
#[derive(Parser)]
pub struct CirArgs {
    /// Go file to translate
    pub path: PathBuf,

    /// Use the braced rendering instead of indented blocks
    #[arg(long)]
    pub braced: bool,
}

/// JSON shape of one emitted report.
#[derive(Serialize)]
struct JsonReport<'a> {
    phase: &'a str,
    rule: Option<String>,
    file: &'a str,
    line: usize,
    column: usize,
    message: &'a str,
}

/// Run the parsed command, returning the process exit code.
pub fn run(cli: Cli) -> i32 {
    match cli.command {
        Commands::Lint(args) => run_lint(&args),
        Commands::Cir(args) => run_cir(&args),
    }
}

fn run_lint(args: &LintArgs) -> i32 {
    let registry = match load_registry(args.config.as_deref()) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            return EXIT_ERROR;
        }
    };

    let analyzer = Analyzer::with_options(
        registry,
        AnalyzerOptions {
            fork_budget: args.fork_budget,
            parallel: !args.sequential,
        },
    );

    let files = collect_go_files(&args.path);
    if files.is_empty() {
        eprintln!("{} no Go files under {}", "error:".red().bold(), args.path.display());
        return EXIT_ERROR;
    }

    let mut all_reports: Vec<Report> = Vec::new();
    for file in &files {
        match analyzer.analyze_file(file) {
            Ok(analysis) => all_reports.extend(analysis.sorted_reports()),
            Err(err) => {
                eprintln!("{} {}: {err:#}", "error:".red().bold(), file.display());
                return EXIT_ERROR;
            }
        }
    }
    all_reports.sort_by(|a, b| {
        let ka = (&a.pos.file, a.pos.line, a.pos.column, a.rule.map(|r| r.number()));
        let kb = (&b.pos.file, b.pos.line, b.pos.column, b.rule.map(|r| r.number()));
        ka.cmp(&kb)
    });

    match args.format.as_str() {
        "json" => print_json(&all_reports),
        _ => print_pretty(&all_reports, files.len()),
    }

    if all_reports.iter().any(|r| r.rule.is_some()) {
        EXIT_VIOLATIONS
    } else {
        EXIT_SUCCESS
    }
}

fn run_cir(args: &CirArgs) -> i32 {
    let analyzer = Analyzer::with_options(
        Registry::defaults(),
        AnalyzerOptions {
            parallel: false,
            ..Default::default()
        },
    );
    match analyzer.analyze_file(&args.path) {
        Ok(analysis) => {
            print!("{}", analysis.program.pretty(!args.braced));
            EXIT_SUCCESS
        }
        Err(err) => {
            eprintln!("{} {}: {err:#}", "error:".red().bold(), args.path.display());
            EXIT_ERROR
        }
    }
}

/// Load the registry from an explicit config path, a discovered default
/// file, or fall back to the built-in table.
fn load_registry(config: Option<&Path>) -> anyhow::Result<Registry> {
    if let Some(path) = config {
        let file = RegistryFile::parse_file(path)?;
        return Ok(Registry::with_overrides(&file)?);
    }
    for name in DEFAULT_CONFIG_NAMES {
        let candidate = PathBuf::from(name);
        if candidate.exists() {
            let file = RegistryFile::parse_file(&candidate)?;
            return Ok(Registry::with_overrides(&file)?);
        }
    }
    Ok(Registry::defaults())
}

fn collect_go_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().map(|e| e == "go").unwrap_or(false))
        .collect();
    files.sort();
    files
}

fn print_pretty(reports: &[Report], scanned: usize) {
    for report in reports {
        let code = match report.rule {
            Some(rule) => rule.code(),
            None => "internal".to_string(),
        };
        let code = if report.rule.is_some() {
            code.as_str().red().bold()
        } else {
            code.as_str().yellow()
        };
        println!(
            "{}:{}:{}: [{}] {} {}",
            report.pos.file, report.pos.line, report.pos.column, report.phase, code, report.message
        );
    }
    let violations = reports.iter().filter(|r| r.rule.is_some()).count();
    if violations == 0 {
        println!("{} {scanned} file(s) clean", "ok:".green().bold());
    } else {
        println!(
            "{} {violations} violation(s) in {scanned} file(s)",
            "found:".red().bold()
        );
    }
}

fn print_json(reports: &[Report]) {
    let entries: Vec<JsonReport<'_>> = reports
        .iter()
        .map(|r| JsonReport {
            phase: r.phase.as_str(),
            rule: r.rule.map(|rule| rule.code()),
            file: &r.pos.file,
            line: r.pos.line,
            column: r.pos.column,
            message: &r.message,
        })
        .collect();
    match serde_json::to_string_pretty(&entries) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("{} render JSON: {err}", "error:".red().bold()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_go_files_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.go"), "package b\n").unwrap();
        fs::write(temp.path().join("a.go"), "package a\n").unwrap();
        fs::write(temp.path().join("notes.txt"), "x\n").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub").join("c.go"), "package c\n").unwrap();

        let files = collect_go_files(temp.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.go", "b.go", "c.go"]);
    }

    #[test]
    fn test_load_registry_without_config_uses_defaults() {
        let registry = load_registry(None).unwrap();
        assert_eq!(registry, Registry::defaults());
    }

    #[test]
    fn test_load_registry_rejects_bad_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cerrful.yaml");
        fs::write(&path, "constructors:\n  - 'not a reference'\n").unwrap();
        assert!(load_registry(Some(&path)).is_err());
    }
}

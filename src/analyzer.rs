//! Per-unit analysis driver.
//!
//! Runs the pipeline phases for one compilation unit: syntax lowering, CIR
//! translation, span indexing, then fact tracking per function. Translation
//! and indexing are strictly sequential; fact tracking fans out across
//! functions. The reporter is the only shared mutable resource.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use rayon::prelude::*;
use tracing::debug;

use crate::cir::{Function, Program};
use crate::flow::{Tracker, TrackerOptions};
use crate::registry::Registry;
use crate::report::{Phase, Report, Reporter};
use crate::span::index_function;
use crate::syntax::parse_unit;
use crate::translate::Translator;

/// Knobs for a single analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Live-frame budget for the path-sensitive tracker.
    pub fork_budget: usize,
    /// Fan fact tracking out across functions.
    pub parallel: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            fork_budget: TrackerOptions::default().fork_budget,
            parallel: true,
        }
    }
}

/// The result of analyzing one compilation unit.
#[derive(Debug)]
pub struct UnitAnalysis {
    pub program: Program,
    pub reports: Vec<Report>,
}

impl UnitAnalysis {
    /// Reports sorted by `(file, line, column, rule)` for deterministic
    /// consumption.
    pub fn sorted_reports(&self) -> Vec<Report> {
        let mut out = self.reports.clone();
        out.sort_by(|a, b| {
            let ka = (&a.pos.file, a.pos.line, a.pos.column, a.rule.map(|r| r.number()));
            let kb = (&b.pos.file, b.pos.line, b.pos.column, b.rule.map(|r| r.number()));
            ka.cmp(&kb)
        });
        out
    }

    /// True when at least one record names a catalog rule.
    pub fn has_violations(&self) -> bool {
        self.reports.iter().any(|r| r.rule.is_some())
    }
}

/// Drives the analysis pipeline over compilation units. The registry
/// outlives all analyses in one run.
pub struct Analyzer {
    registry: Registry,
    options: AnalyzerOptions,
    cancel: Arc<AtomicBool>,
}

impl Analyzer {
    pub fn new(registry: Registry) -> Self {
        Self::with_options(registry, AnalyzerOptions::default())
    }

    pub fn with_options(registry: Registry, options: AnalyzerOptions) -> Self {
        Self {
            registry,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A flag callers may set to stop the run cooperatively. It is checked
    /// between functions; in-flight function analysis runs to completion.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Analyze one file from disk.
    pub fn analyze_file(&self, path: &Path) -> anyhow::Result<UnitAnalysis> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("read source file {}", path.display()))?;
        self.analyze_source(path, &source)
    }

    /// Analyze one compilation unit from memory. `path` still matters for
    /// positions and module discovery.
    pub fn analyze_source(&self, path: &Path, source: &str) -> anyhow::Result<UnitAnalysis> {
        let unit = parse_unit(path, source)?;
        debug!(file = %unit.file, functions = unit.funcs.len(), "unit lowered");

        let reporter = Reporter::new();
        let translator = Translator::new(&self.registry, reporter.phase(Phase::Translation));
        let program = translator.translate(&unit);

        let tracker_options = TrackerOptions {
            fork_budget: self.options.fork_budget,
        };
        let track_one = |function: &Function| {
            if self.cancel.load(Ordering::Relaxed) {
                return;
            }
            let index = index_function(function);
            let tracker = Tracker::new(&self.registry, &reporter, tracker_options);
            tracker.track(function, &index);
        };

        if self.options.parallel {
            program.functions.par_iter().for_each(track_one);
        } else {
            program.functions.iter().for_each(track_one);
        }

        Ok(UnitAnalysis {
            program,
            reports: reporter.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use std::path::PathBuf;

    fn analyzer() -> Analyzer {
        Analyzer::with_options(
            Registry::defaults(),
            AnalyzerOptions {
                parallel: false,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let src = r#"package demo

import (
    "fmt"
    "os"
)

func read(path string) error {
    _, err := os.Open(path)
    if err != nil {
        return fmt.Errorf("open data: %w", err)
    }
    return nil
}

func leak(path string) error {
    _, err := os.Open(path)
    return nil
}
"#;
        let analysis = analyzer()
            .analyze_source(&PathBuf::from("demo.go"), src)
            .unwrap();

        assert_eq!(analysis.program.functions.len(), 2);
        let rules: Vec<_> = analysis.reports.iter().filter_map(|r| r.rule).collect();
        assert_eq!(rules, vec![Rule::NoSilentDrop]);
    }

    #[test]
    fn test_cancellation_skips_tracking() {
        let analyzer = analyzer();
        analyzer.cancel_flag().store(true, Ordering::Relaxed);
        let src = r#"package demo

import "os"

func leak(path string) error {
    _, err := os.Open(path)
    return nil
}
"#;
        let analysis = analyzer
            .analyze_source(&PathBuf::from("demo.go"), src)
            .unwrap();
        // Translation still ran, tracking did not.
        assert_eq!(analysis.program.functions.len(), 1);
        assert!(analysis.reports.is_empty());
    }

    #[test]
    fn test_sorted_reports_are_deterministic() {
        let src = r#"package demo

import "os"

func a(path string) error {
    _, err := os.Open(path)
    return nil
}

func b(path string) error {
    _, err := os.Open(path)
    return nil
}
"#;
        let parallel = Analyzer::new(Registry::defaults());
        let analysis = parallel
            .analyze_source(&PathBuf::from("demo.go"), src)
            .unwrap();
        let sorted = analysis.sorted_reports();
        assert_eq!(sorted.len(), 2);
        assert!(sorted[0].pos.line < sorted[1].pos.line);
    }
}

//! Report collection for the analysis pipeline.
//!
//! The reporter is the only shared mutable resource across intra-unit
//! parallelism: appends are serialized under a single mutex and readers take
//! a snapshot before iterating.

use std::fmt;
use std::sync::Mutex;

use crate::cir::Position;
use crate::rules::Rule;

/// The pipeline stage a report was generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// CIR translation over the syntax tree.
    Translation,
    /// Path interpretation over the control-flow graph.
    Trace,
    /// Post-trace error state analysis.
    State,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Translation => "translation",
            Phase::Trace => "trace",
            Phase::State => "state",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single diagnostic entry.
///
/// `rule` is `None` for analyzer self-diagnostics (fork budget overruns,
/// dropped functions) that do not correspond to a source-level violation.
#[derive(Debug, Clone)]
pub struct Report {
    pub phase: Phase,
    pub rule: Option<Rule>,
    pub pos: Position,
    pub message: String,
    pub details: Option<String>,
}

impl Report {
    /// Compact human-readable rendering: `[phase] CODE - message (file:line)`.
    pub fn summary_line(&self) -> String {
        let code = match self.rule {
            Some(rule) => rule.code(),
            None => "internal".to_string(),
        };
        format!(
            "[{}] {} - {} ({}:{})",
            self.phase, code, self.message, self.pos.file, self.pos.line
        )
    }
}

/// Collects and classifies inconsistencies discovered during analysis.
#[derive(Debug, Default)]
pub struct Reporter {
    reports: Mutex<Vec<Report>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fully-formed record.
    pub fn add(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
    }

    /// Bind this reporter to a fixed phase.
    pub fn phase(&self, phase: Phase) -> PhaseReporter<'_> {
        PhaseReporter {
            parent: self,
            phase,
        }
    }

    /// A copy of all collected records; mutating it does not affect the
    /// reporter.
    pub fn snapshot(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    /// Snapshot sorted by `(file, line, column, rule)` for callers that need
    /// deterministic output across functions and units.
    pub fn sorted_snapshot(&self) -> Vec<Report> {
        let mut out = self.snapshot();
        out.sort_by(|a, b| {
            (&a.pos.file, a.pos.line, a.pos.column, rule_key(a))
                .cmp(&(&b.pos.file, b.pos.line, b.pos.column, rule_key(b)))
        });
        out
    }

    /// True when at least one record names a catalog rule.
    pub fn has_violations(&self) -> bool {
        self.reports.lock().unwrap().iter().any(|r| r.rule.is_some())
    }
}

fn rule_key(report: &Report) -> u16 {
    report.rule.map(|r| r.number()).unwrap_or(u16::MAX)
}

/// A reporter bound to a fixed phase, used through an entire analysis pass to
/// record rule violations without repeating the phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseReporter<'a> {
    parent: &'a Reporter,
    phase: Phase,
}

impl<'a> PhaseReporter<'a> {
    /// Record a rule violation. An empty message is replaced by the rule's
    /// description at record time.
    pub fn report(&self, rule: Rule, message: impl Into<String>, pos: Position) {
        let mut message = message.into();
        if message.is_empty() {
            message = rule.description();
        }
        self.parent.add(Report {
            phase: self.phase,
            rule: Some(rule),
            pos,
            message,
            details: None,
        });
    }

    /// Record an analyzer self-diagnostic with no rule code.
    pub fn diagnostic(&self, message: impl Into<String>, pos: Position) {
        self.parent.add(Report {
            phase: self.phase,
            rule: None,
            pos,
            message: message.into(),
            details: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(file: &str, line: usize) -> Position {
        Position::new(file, line, 1, 0)
    }

    #[test]
    fn test_phase_binding_and_snapshot() {
        let reporter = Reporter::new();
        let translation = reporter.phase(Phase::Translation);
        let state = reporter.phase(Phase::State);

        translation.report(Rule::AnnotateExternal, "wrap it", pos("main.go", 10));
        state.report(Rule::NoSilentDrop, "", pos("main.go", 20));

        let reports = reporter.snapshot();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].phase, Phase::Translation);
        assert_eq!(reports[0].rule, Some(Rule::AnnotateExternal));
        assert_eq!(reports[0].message, "wrap it");
        // Empty message replaced by the rule description.
        assert_eq!(reports[1].message, Rule::NoSilentDrop.description());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let reporter = Reporter::new();
        reporter
            .phase(Phase::Trace)
            .report(Rule::NoSilentDrop, "x", pos("a.go", 1));

        let mut first = reporter.snapshot();
        first[0].message = "changed".to_string();
        let second = reporter.snapshot();
        assert_eq!(second[0].message, "x");
    }

    #[test]
    fn test_concurrent_appends() {
        use std::sync::Arc;
        let reporter = Arc::new(Reporter::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let reporter = reporter.clone();
            handles.push(std::thread::spawn(move || {
                reporter
                    .phase(Phase::Trace)
                    .report(Rule::NoSilentDrop, "parallel add", pos("a.go", i));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reporter.snapshot().len(), 32);
    }

    #[test]
    fn test_sorted_snapshot_ordering() {
        let reporter = Reporter::new();
        let trace = reporter.phase(Phase::Trace);
        trace.report(Rule::NoLogAndReturn, "b", pos("b.go", 3));
        trace.report(Rule::NoSilentDrop, "a", pos("a.go", 9));
        trace.report(Rule::AnnotateExternal, "a2", pos("a.go", 2));

        let sorted = reporter.sorted_snapshot();
        assert_eq!(sorted[0].pos.file, "a.go");
        assert_eq!(sorted[0].pos.line, 2);
        assert_eq!(sorted[2].pos.file, "b.go");
    }

    #[test]
    fn test_diagnostic_has_no_rule() {
        let reporter = Reporter::new();
        reporter
            .phase(Phase::Trace)
            .diagnostic("fork budget exceeded in doWork", pos("a.go", 1));
        let reports = reporter.snapshot();
        assert_eq!(reports[0].rule, None);
        assert!(reports[0].summary_line().contains("internal"));
    }
}

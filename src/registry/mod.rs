//! Catalog of recognized external symbols.
//!
//! The registry answers "what is this callee" questions for the translator
//! and the fact tracker: wrappers, loggers, checker predicates, error
//! constructors, abandon/terminator calls, and benign sentinels. It is built
//! once per run by merging a hard-coded default table with user overrides and
//! outlives all analyses.

mod config;

pub use config::{ConfigError, RegistryFile};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cir::{LogLevel, Reference};

/// Wrap strategy of a registered wrapper function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapKind {
    /// Format-style: a format string with a `%w` verb, the wrapped error is
    /// the trailing argument (`fmt.Errorf`).
    #[serde(rename = "fmt")]
    Format,
    /// Errors-style: the error is the first argument, the annotation the
    /// second (`errors.Wrap`).
    #[serde(rename = "errors")]
    Errors,
}

/// How an abandon call terminates control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbandonKind {
    /// Stops the flow without reporting anything (`panic`, `os.Exit`).
    Silent,
    /// Logs a formatted message before stopping (`log.Fatalf`).
    Format,
}

/// Lookup maps for recognized external symbols. Lookups are by exact
/// reference equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    wrappers: HashMap<Reference, WrapKind>,
    loggers: HashMap<Reference, LogLevel>,
    checkers: HashMap<Reference, Reference>,
    constructors: HashSet<Reference>,
    abandon: HashMap<Reference, AbandonKind>,
    benign_sentinels: HashSet<Reference>,
}

impl Registry {
    /// An empty registry; useful as an override accumulator.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The hard-coded default table.
    pub fn defaults() -> Self {
        let mut r = Registry::empty();

        // Wrappers.
        r.register_wrapper(Reference::func("fmt", "Errorf"), WrapKind::Format);
        r.register_wrapper(
            Reference::func("golang.org/x/xerrors", "Errorf"),
            WrapKind::Format,
        );
        for name in ["Wrap", "Wrapf", "WithMessage", "WithMessagef"] {
            r.register_wrapper(
                Reference::func("github.com/pkg/errors", name),
                WrapKind::Errors,
            );
        }

        // Loggers.
        for name in ["Print", "Printf", "Println"] {
            r.register_logger(Reference::func("fmt", name), LogLevel::Warn);
            r.register_logger(Reference::func("log", name), LogLevel::Warn);
        }
        for name in ["Fatal", "Fatalf", "Fatalln", "Panic", "Panicf", "Panicln"] {
            r.register_logger(Reference::func("log", name), LogLevel::Fatal);
        }
        r.register_logger(Reference::func("log/slog", "Debug"), LogLevel::Other);
        r.register_logger(Reference::func("log/slog", "Info"), LogLevel::Other);
        r.register_logger(Reference::func("log/slog", "Warn"), LogLevel::Warn);
        r.register_logger(Reference::func("log/slog", "Error"), LogLevel::Error);
        r.register_logger(Reference::func("testing", "Log"), LogLevel::Warn);
        r.register_logger(Reference::func("testing", "Error"), LogLevel::Error);
        r.register_logger(Reference::func("testing", "Fatal"), LogLevel::Fatal);
        r.register_logger(Reference::func("testing", "Fatalf"), LogLevel::Fatal);

        // Checker predicates with a fixed semantic class.
        r.register_checker(
            Reference::func("os", "IsExist"),
            Reference::func("os", "ErrExist"),
        );
        r.register_checker(
            Reference::func("os", "IsNotExist"),
            Reference::func("os", "ErrNotExist"),
        );
        r.register_checker(
            Reference::func("os", "IsTimeout"),
            Reference::func("os", "ErrTimeout"),
        );
        r.register_checker(
            Reference::func("os", "IsPermission"),
            Reference::func("os", "ErrPermission"),
        );
        // Wildcard checkers: the class comes from the call's second argument.
        r.register_checker(Reference::func("errors", "Is"), Reference::any_class());
        r.register_checker(Reference::func("errors", "As"), Reference::any_class());

        // Constructors. fmt.Errorf plays a dual role: it is a constructor
        // only when its format carries no %w verb.
        r.register_constructor(Reference::func("errors", "New"));
        r.register_constructor(Reference::func("fmt", "Errorf"));

        // Abandon calls.
        r.register_abandon(Reference::func("builtin", "panic"), AbandonKind::Silent);
        r.register_abandon(Reference::func("os", "Exit"), AbandonKind::Silent);
        for name in ["Fatal", "Fatalf", "Fatalln", "Panic", "Panicf", "Panicln"] {
            r.register_abandon(Reference::func("log", name), AbandonKind::Format);
        }
        r.register_abandon(Reference::func("testing", "Fatal"), AbandonKind::Format);
        r.register_abandon(Reference::func("testing", "Fatalf"), AbandonKind::Format);

        // Benign sentinels: end-of-stream markers may be dropped silently.
        r.register_benign_sentinel(Reference::func("io", "EOF"));

        r
    }

    /// Defaults merged with user overrides loaded from a config file.
    pub fn with_overrides(file: &RegistryFile) -> Result<Self, ConfigError> {
        let overrides = file.to_registry()?;
        Ok(Self::defaults().merge(overrides))
    }

    // --- Registration -----------------------------------------------------

    pub fn register_wrapper(&mut self, reference: Reference, kind: WrapKind) {
        self.wrappers.insert(reference, kind);
    }

    pub fn register_logger(&mut self, reference: Reference, level: LogLevel) {
        self.loggers.insert(reference, level);
    }

    pub fn register_checker(&mut self, predicate: Reference, class: Reference) {
        self.checkers.insert(predicate, class);
    }

    pub fn register_constructor(&mut self, reference: Reference) {
        self.constructors.insert(reference);
    }

    pub fn register_abandon(&mut self, reference: Reference, kind: AbandonKind) {
        self.abandon.insert(reference, kind);
    }

    pub fn register_benign_sentinel(&mut self, reference: Reference) {
        self.benign_sentinels.insert(reference);
    }

    /// Merge `overrides` into `self`. On conflict the override wins. The
    /// operation is associative.
    pub fn merge(mut self, overrides: Registry) -> Registry {
        self.wrappers.extend(overrides.wrappers);
        self.loggers.extend(overrides.loggers);
        self.checkers.extend(overrides.checkers);
        self.constructors.extend(overrides.constructors);
        self.abandon.extend(overrides.abandon);
        self.benign_sentinels.extend(overrides.benign_sentinels);
        self
    }

    // --- Lookups ----------------------------------------------------------

    pub fn wrapper(&self, reference: &Reference) -> Option<WrapKind> {
        self.wrappers.get(reference).copied()
    }

    pub fn logger(&self, reference: &Reference) -> Option<LogLevel> {
        self.loggers.get(reference).copied()
    }

    pub fn checker(&self, reference: &Reference) -> Option<&Reference> {
        self.checkers.get(reference)
    }

    pub fn is_constructor(&self, reference: &Reference) -> bool {
        self.constructors.contains(reference)
    }

    pub fn abandon(&self, reference: &Reference) -> Option<AbandonKind> {
        self.abandon.get(reference).copied()
    }

    pub fn is_benign_sentinel(&self, reference: &Reference) -> bool {
        self.benign_sentinels.contains(reference)
    }
}

//! Cerrful - static analysis of Go error-handling discipline.
//!
//! Cerrful enforces the CER rule series: every error value must be owned by
//! exactly one handler, annotated once when it crosses a semantic boundary,
//! and never both logged and returned.
//!
//! # Architecture
//!
//! The analysis pipeline runs three phases per compilation unit:
//!
//! - `syntax`: tree-sitter front end lowering Go source into a reduced
//!   statement model with best-effort resolution
//! - `translate`: lowering into CIR, the error-centric intermediate
//!   representation (`cir`)
//! - `span`: position-indexed containment tree over CIR nodes
//! - `flow`: path-sensitive fact tracking over the control-flow graph
//! - `report`: thread-safe collection of rule violations (`rules`)
//!
//! The `registry` catalogs recognized wrappers, loggers, checker predicates,
//! constructors, abandon calls, and benign sentinels; `analyzer` drives the
//! phases. Data flow is strictly bottom-up and single-pass.

pub mod analyzer;
pub mod cir;
pub mod cli;
pub mod flow;
pub mod registry;
pub mod report;
pub mod rules;
pub mod span;
pub mod syntax;
pub mod translate;

pub use analyzer::{Analyzer, AnalyzerOptions, UnitAnalysis};
pub use cir::{Node, Position, Program, Reference, Span};
pub use registry::{Registry, RegistryFile};
pub use report::{Phase, Report, Reporter};
pub use rules::Rule;

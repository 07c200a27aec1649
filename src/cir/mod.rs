//! Contextual Intermediate Representation (CIR).
//!
//! CIR is an error-centric lowering of Go source statements: a flattened
//! statement graph that keeps only the constructs participating in
//! error-handling flow (assignments of error values, wraps, returns, logs,
//! recognized checks, and the conditionals around them). Higher phases attach
//! flow facts to CIR nodes and fire rule violations against them.

mod pretty;
mod reference;

pub use reference::{Reference, ReferenceParseError};

use std::fmt;

/// A resolved source location.
///
/// `offset` is the ordered token position (byte offset within the unit) used
/// by the span index; `line`/`column` are 1-based and used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(file: impl Into<String>, line: usize, column: usize, offset: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A closed interval `[start, end]` of token positions.
///
/// Spans produced from one syntax tree are either disjoint or in a strict
/// containment relation; partial overlap violates input assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Build a closed span from tree-sitter byte offsets (exclusive end).
    pub fn from_bytes(start_byte: usize, end_byte: usize) -> Self {
        Self {
            start: start_byte,
            end: end_byte.saturating_sub(1).max(start_byte),
        }
    }

    pub fn covers(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}

/// Severity attached to a `Log` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Warn,
    Error,
    Fatal,
    Other,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Other => "other",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "other" => Ok(LogLevel::Other),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

/// How an error variable came to hold its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Constructor call producing a fresh error with no prior chain.
    Ctor { msg: String, via: String },
    /// A call returning an error; `callee` is the rendered callee with
    /// elided arguments, `local` distinguishes same-module callees.
    Call { callee: String, local: bool },
    /// A package-level error value used as a comparison target.
    Sentinel {
        symbol: Reference,
        rendered: String,
        local: bool,
    },
    /// Direct aliasing of another error variable.
    Alias { target: String },
    /// Extraction via a type assertion to the error interface.
    TypeAssert { expr: String },
    /// Explicit nil assignment.
    Nil,
}

/// Structured condition predicate over an error variable, or opaque text
/// when the condition shape is not recognizable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    NotNil(String),
    IsNil(String),
    EqSentinel {
        name: String,
        sentinel: Reference,
        rendered: String,
    },
    NeqSentinel {
        name: String,
        sentinel: Reference,
        rendered: String,
    },
    Opaque(String),
}

impl Cond {
    /// Render the condition back to its source-like text.
    pub fn render(&self) -> String {
        match self {
            Cond::NotNil(name) => format!("{name} != nil"),
            Cond::IsNil(name) => format!("{name} == nil"),
            Cond::EqSentinel { name, rendered, .. } => format!("{name} == {rendered}"),
            Cond::NeqSentinel { name, rendered, .. } => format!("{name} != {rendered}"),
            Cond::Opaque(text) => text.clone(),
        }
    }
}

/// Binds an error-typed name to an error-valued source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assign {
    pub pos: Position,
    pub span: Span,
    pub name: String,
    pub source: Source,
    /// True when the error landed in the blank identifier.
    pub discarded: bool,
}

/// Records that `name` has been wrapped with `msg` via the wrapper `via`.
/// Always refers to an already-bound name; never introduces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrap {
    pub pos: Position,
    pub span: Span,
    pub name: String,
    pub msg: String,
    pub via: String,
}

/// Marks that `name` is returned as the function's error result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Return {
    pub pos: Position,
    pub span: Span,
    pub name: String,
}

/// Logs one or more error variables at a severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub pos: Position,
    pub span: Span,
    pub names: Vec<String>,
    pub level: LogLevel,
    pub via: String,
}

/// A recognized predicate call associating names with a semantic class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub pos: Position,
    pub span: Span,
    pub names: Vec<String>,
    pub args: Vec<String>,
    pub predicate: Reference,
    pub class: Reference,
    /// True for exact-match predicates (`errors.As`, `==` against a
    /// sentinel); false for belongs-to predicates (`errors.Is`, `os.IsX`).
    pub exact: bool,
}

/// Conditional branching with CIR subsequences for each arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    pub pos: Position,
    pub span: Span,
    pub cond: Cond,
    pub then: Vec<Node>,
    pub els: Vec<Node>,
}

/// A single CIR node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Assign(Assign),
    Wrap(Wrap),
    Return(Return),
    Log(Log),
    Check(Check),
    If(If),
}

impl Node {
    pub fn pos(&self) -> &Position {
        match self {
            Node::Assign(n) => &n.pos,
            Node::Wrap(n) => &n.pos,
            Node::Return(n) => &n.pos,
            Node::Log(n) => &n.pos,
            Node::Check(n) => &n.pos,
            Node::If(n) => &n.pos,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Assign(n) => n.span,
            Node::Wrap(n) => n.span,
            Node::Return(n) => n.span,
            Node::Log(n) => n.span,
            Node::Check(n) => n.span,
            Node::If(n) => n.span,
        }
    }
}

/// The error-relevant statement skeleton of one function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    /// Whether the function's last result type is the error interface.
    pub returns_error: bool,
    pub nodes: Vec<Node>,
}

impl Function {
    /// Count syntactic return sites propagating an error, including nested
    /// branches. Used for pass-through detection.
    pub fn error_return_sites(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            let mut n = 0;
            for node in nodes {
                match node {
                    Node::Return(_) => n += 1,
                    Node::If(iff) => n += count(&iff.then) + count(&iff.els),
                    _ => {}
                }
            }
            n
        }
        count(&self.nodes)
    }
}

/// CIR for one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub file: String,
    pub functions: Vec<Function>,
}

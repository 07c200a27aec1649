//! Go syntax front end.
//!
//! Stands in for the host analysis driver: parses one compilation unit with
//! tree-sitter, lowers it into a reduced statement model, and carries the
//! best-effort resolution tables (imports, module path, package sentinels)
//! the translator needs. Type information is partial; downstream
//! classification degrades to conservative defaults where it is missing.

pub mod ast;
mod lower;
mod module;

pub use ast::{
    AssignStmt, BinaryExpr, CallExpr, Expr, ExprStmt, FuncDecl, Ident, IfStmt, Import,
    OpaqueExpr, ResultSlot, ReturnStmt, SelectorExpr, SourceUnit, Stmt, StringLit,
    TypeAssertExpr,
};
pub use lower::parse_unit;
pub use module::find_module_path;

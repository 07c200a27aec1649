//! Statement and expression model of one Go compilation unit.
//!
//! This is the shape the translator consumes: a reduced syntax tree covering
//! the statements that participate in error-handling flow. Constructs with no
//! error relevance lower to opaque statements and are skipped downstream.

use crate::cir::{Position, Span};

/// One parsed compilation unit with best-effort resolution tables.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    /// Base file name used in positions.
    pub file: String,
    /// Declared package name.
    pub package: String,
    /// Module path from the nearest manifest; empty when none was found.
    pub module_path: String,
    pub imports: Vec<Import>,
    /// Package-level error values declared in this unit.
    pub package_sentinels: Vec<String>,
    pub funcs: Vec<FuncDecl>,
}

impl SourceUnit {
    /// Resolve a package identifier to its import path.
    pub fn resolve_import(&self, ident: &str) -> Option<&str> {
        for import in &self.imports {
            let name = match &import.alias {
                Some(alias) => alias.as_str(),
                None => import.path.rsplit('/').next().unwrap_or(&import.path),
            };
            if name == ident {
                return Some(&import.path);
            }
        }
        None
    }

    /// Whether an import path belongs to the analyzed module.
    ///
    /// Standard-library packages (no dot in the path) are always foreign.
    /// Without a module manifest, locality degrades to package-name
    /// comparison.
    pub fn is_local_package(&self, path: &str) -> bool {
        if self.module_path.is_empty() {
            return path == self.package;
        }
        if !path.contains('.') {
            return false;
        }
        path.starts_with(&self.module_path)
    }
}

/// An import declaration.
#[derive(Debug, Clone)]
pub struct Import {
    pub alias: Option<String>,
    pub path: String,
    pub pos: Position,
}

/// One result slot of a function signature.
#[derive(Debug, Clone)]
pub struct ResultSlot {
    pub name: Option<String>,
    pub type_text: String,
}

impl ResultSlot {
    pub fn is_error(&self) -> bool {
        self.type_text == "error"
    }
}

/// A function or method declaration with its lowered body.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub receiver: Option<String>,
    pub results: Vec<ResultSlot>,
    pub body: Vec<Stmt>,
    pub pos: Position,
    pub span: Span,
}

impl FuncDecl {
    /// The function's last result type is the error interface.
    pub fn returns_error(&self) -> bool {
        self.results.last().map(|r| r.is_error()).unwrap_or(false)
    }

    /// Named error results, used for return-site name synthesis.
    pub fn named_error_returns(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.is_error())
            .filter_map(|r| r.name.as_deref())
            .collect()
    }

    /// An error result appears before the last slot.
    pub fn error_before_last(&self) -> bool {
        let n = self.results.len();
        n > 1 && self.results[..n - 1].iter().any(|r| r.is_error())
    }
}

/// A lowered statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    Assign(AssignStmt),
    Expr(ExprStmt),
    If(IfStmt),
    Return(ReturnStmt),
    /// A bare nested block.
    Block(Vec<Stmt>),
    /// Anything else; carries no error-handling semantics.
    Opaque,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub lhs: Vec<Expr>,
    pub rhs: Vec<Expr>,
    /// `:=` rather than `=`.
    pub define: bool,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub then: Vec<Stmt>,
    pub els: Vec<Stmt>,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub results: Vec<Expr>,
    pub pos: Position,
    pub span: Span,
}

/// A lowered expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    Selector(SelectorExpr),
    Call(CallExpr),
    StringLit(StringLit),
    Nil(Position, Span),
    TypeAssert(TypeAssertExpr),
    Binary(BinaryExpr),
    Opaque(OpaqueExpr),
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SelectorExpr {
    pub base: Box<Expr>,
    pub field: String,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StringLit {
    /// Content without the surrounding quotes.
    pub value: String,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeAssertExpr {
    pub operand: Box<Expr>,
    pub type_text: String,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: String,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub pos: Position,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct OpaqueExpr {
    pub text: String,
    pub pos: Position,
    pub span: Span,
}

impl Expr {
    pub fn pos(&self) -> &Position {
        match self {
            Expr::Ident(x) => &x.pos,
            Expr::Selector(x) => &x.pos,
            Expr::Call(x) => &x.pos,
            Expr::StringLit(x) => &x.pos,
            Expr::Nil(pos, _) => pos,
            Expr::TypeAssert(x) => &x.pos,
            Expr::Binary(x) => &x.pos,
            Expr::Opaque(x) => &x.pos,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(x) => x.span,
            Expr::Selector(x) => x.span,
            Expr::Call(x) => x.span,
            Expr::StringLit(x) => x.span,
            Expr::Nil(_, span) => *span,
            Expr::TypeAssert(x) => x.span,
            Expr::Binary(x) => x.span,
            Expr::Opaque(x) => x.span,
        }
    }

    /// Source-like rendering used for opaque conditions and diagnostics.
    pub fn render(&self) -> String {
        match self {
            Expr::Ident(x) => x.name.clone(),
            Expr::Selector(x) => format!("{}.{}", x.base.render(), x.field),
            Expr::Call(x) => {
                if x.args.is_empty() {
                    format!("{}()", x.callee.render())
                } else {
                    format!("{}(…)", x.callee.render())
                }
            }
            Expr::StringLit(x) => format!("{:?}", x.value),
            Expr::Nil(..) => "nil".to_string(),
            Expr::TypeAssert(x) => format!("{}.({})", x.operand.render(), x.type_text),
            Expr::Binary(x) => {
                format!("{} {} {}", x.left.render(), x.op, x.right.render())
            }
            Expr::Opaque(x) => x.text.clone(),
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(x) => Some(&x.name),
            _ => None,
        }
    }

    /// `pkg.Name`-shaped selector: base identifier plus field.
    pub fn as_selector_path(&self) -> Option<(&str, &str)> {
        match self {
            Expr::Selector(x) => x.base.as_ident().map(|base| (base, x.field.as_str())),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Expr::Nil(..))
    }

    pub fn is_blank(&self) -> bool {
        self.as_ident() == Some("_")
    }
}

//! Tree-sitter based lowering of Go source into the reduced syntax model.
//!
//! Parsing is best-effort: partial parse errors still produce a valid tree
//! with ERROR nodes, and unrecognized constructs lower to opaque statements.
//! This mirrors the contract of the host driver the core is specified
//! against: analysis proceeds with whatever partial information is available.

use std::path::Path;

use anyhow::Context as _;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::cir::{Position, Span};

use super::ast::{
    AssignStmt, BinaryExpr, CallExpr, Expr, ExprStmt, FuncDecl, Ident, IfStmt, Import,
    OpaqueExpr, ResultSlot, ReturnStmt, SelectorExpr, SourceUnit, Stmt, StringLit,
    TypeAssertExpr,
};
use super::module::find_module_path;

/// Tree-sitter query locating function and method declarations.
const DECLARATION_QUERY: &str = r#"
(function_declaration) @function
(method_declaration) @method
"#;

/// Parse one Go compilation unit and lower it.
pub fn parse_unit(path: &Path, source: &str) -> anyhow::Result<SourceUnit> {
    let language: Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .context("load Go grammar")?;
    let tree = parser
        .parse(source.as_bytes(), None)
        .context("parse Go source")?;

    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    let lowerer = Lowerer {
        source: source.as_bytes(),
        file: &file,
    };

    let mut unit = SourceUnit {
        file: file.clone(),
        module_path: find_module_path(path),
        ..Default::default()
    };

    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_clause" => {
                if let Some(name) = first_child_of_kind(child, "package_identifier") {
                    unit.package = lowerer.text(name).to_string();
                }
            }
            "import_declaration" => lowerer.collect_imports(child, &mut unit.imports),
            "var_declaration" => lowerer.collect_sentinels(child, &mut unit.package_sentinels),
            _ => {}
        }
    }

    // Function and method declarations via the declaration query.
    let query = Query::new(&language, DECLARATION_QUERY).context("compile declaration query")?;
    let mut qcursor = QueryCursor::new();
    let mut matches = qcursor.matches(&query, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            unit.funcs.push(lowerer.lower_func(capture.node));
        }
    }
    unit.funcs.sort_by_key(|f| f.pos.offset);

    Ok(unit)
}

struct Lowerer<'a> {
    source: &'a [u8],
    file: &'a str,
}

impl<'a> Lowerer<'a> {
    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn pos(&self, node: Node) -> Position {
        let start = node.start_position();
        Position::new(self.file, start.row + 1, start.column + 1, node.start_byte())
    }

    fn span(&self, node: Node) -> Span {
        Span::from_bytes(node.start_byte(), node.end_byte())
    }

    // --- Top-level declarations -------------------------------------------

    fn collect_imports(&self, node: Node, out: &mut Vec<Import>) {
        let mut cursor = node.walk();
        let mut stack: Vec<Node> = node.named_children(&mut cursor).collect();
        while let Some(n) = stack.pop() {
            match n.kind() {
                "import_spec" => {
                    let alias = n
                        .child_by_field_name("name")
                        .map(|a| self.text(a).to_string())
                        .filter(|a| a.as_str() != "_" && a.as_str() != ".");
                    if let Some(path_node) = n.child_by_field_name("path") {
                        out.push(Import {
                            alias,
                            path: unquote(self.text(path_node)),
                            pos: self.pos(n),
                        });
                    }
                }
                "import_spec_list" => {
                    let mut inner = n.walk();
                    stack.extend(n.named_children(&mut inner));
                }
                _ => {}
            }
        }
        out.sort_by_key(|i| i.pos.offset);
    }

    /// Package-level `var` declarations shaped like error sentinels.
    fn collect_sentinels(&self, node: Node, out: &mut Vec<String>) {
        let mut cursor = node.walk();
        let mut specs: Vec<Node> = Vec::new();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "var_spec" => specs.push(child),
                "var_spec_list" => {
                    let mut inner = child.walk();
                    specs.extend(
                        child
                            .named_children(&mut inner)
                            .filter(|c| c.kind() == "var_spec"),
                    );
                }
                _ => {}
            }
        }
        for spec in specs {
            let type_is_error = spec
                .child_by_field_name("type")
                .map(|t| self.text(t) == "error")
                .unwrap_or(false);
            let value_is_ctor = spec
                .child_by_field_name("value")
                .map(|v| self.value_looks_like_error_ctor(v))
                .unwrap_or(false);

            let mut names = Vec::new();
            let mut ncursor = spec.walk();
            for name in spec.children_by_field_name("name", &mut ncursor) {
                names.push(self.text(name).to_string());
            }
            for name in names {
                if type_is_error || value_is_ctor || name.starts_with("Err") {
                    out.push(name);
                }
            }
        }
    }

    fn value_looks_like_error_ctor(&self, value_list: Node) -> bool {
        let mut cursor = value_list.walk();
        for expr in value_list.named_children(&mut cursor) {
            if expr.kind() == "call_expression" {
                if let Some(callee) = expr.child_by_field_name("function") {
                    let text = self.text(callee);
                    if text.ends_with(".New") || text.ends_with(".Errorf") {
                        return true;
                    }
                }
            }
        }
        false
    }

    // --- Functions --------------------------------------------------------

    fn lower_func(&self, node: Node) -> FuncDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let receiver = self.receiver_type(node);
        let results = self.lower_results(node.child_by_field_name("result"));
        let body = node
            .child_by_field_name("body")
            .map(|b| self.lower_block(b))
            .unwrap_or_default();

        FuncDecl {
            name,
            receiver,
            results,
            body,
            pos: self.pos(node),
            span: self.span(node),
        }
    }

    fn receiver_type(&self, node: Node) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        for param in receiver.named_children(&mut cursor) {
            if param.kind() != "parameter_declaration" {
                continue;
            }
            let type_node = param.child_by_field_name("type")?;
            let name = if type_node.kind() == "pointer_type" {
                first_child_of_kind(type_node, "type_identifier")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_else(|| self.text(type_node).trim_start_matches('*').to_string())
            } else {
                self.text(type_node).to_string()
            };
            return Some(name);
        }
        None
    }

    fn lower_results(&self, result: Option<Node>) -> Vec<ResultSlot> {
        let Some(result) = result else {
            return Vec::new();
        };
        if result.kind() != "parameter_list" {
            return vec![ResultSlot {
                name: None,
                type_text: self.text(result).to_string(),
            }];
        }
        let mut slots = Vec::new();
        let mut cursor = result.walk();
        for param in result.named_children(&mut cursor) {
            if param.kind() != "parameter_declaration" {
                continue;
            }
            let type_text = param
                .child_by_field_name("type")
                .map(|t| self.text(t).to_string())
                .unwrap_or_default();
            let mut names = Vec::new();
            let mut ncursor = param.walk();
            for name in param.children_by_field_name("name", &mut ncursor) {
                names.push(self.text(name).to_string());
            }
            if names.is_empty() {
                slots.push(ResultSlot {
                    name: None,
                    type_text,
                });
            } else {
                for name in names {
                    slots.push(ResultSlot {
                        name: Some(name),
                        type_text: type_text.clone(),
                    });
                }
            }
        }
        slots
    }

    // --- Statements -------------------------------------------------------

    fn lower_block(&self, node: Node) -> Vec<Stmt> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .map(|child| self.lower_stmt(child))
            .collect()
    }

    fn lower_stmt(&self, node: Node) -> Stmt {
        match node.kind() {
            "short_var_declaration" => Stmt::Assign(AssignStmt {
                lhs: self.lower_expr_list(node.child_by_field_name("left")),
                rhs: self.lower_expr_list(node.child_by_field_name("right")),
                define: true,
                pos: self.pos(node),
                span: self.span(node),
            }),
            "assignment_statement" => Stmt::Assign(AssignStmt {
                lhs: self.lower_expr_list(node.child_by_field_name("left")),
                rhs: self.lower_expr_list(node.child_by_field_name("right")),
                define: false,
                pos: self.pos(node),
                span: self.span(node),
            }),
            "expression_statement" => {
                let Some(expr) = node.named_child(0) else {
                    return Stmt::Opaque;
                };
                Stmt::Expr(ExprStmt {
                    expr: self.lower_expr(expr),
                    pos: self.pos(node),
                    span: self.span(node),
                })
            }
            "if_statement" => {
                let init = node
                    .child_by_field_name("initializer")
                    .map(|i| Box::new(self.lower_stmt(i)));
                let cond = node
                    .child_by_field_name("condition")
                    .map(|c| self.lower_expr(c))
                    .unwrap_or_else(|| self.opaque_expr(node));
                let then = node
                    .child_by_field_name("consequence")
                    .map(|b| self.lower_block(b))
                    .unwrap_or_default();
                let els = match node.child_by_field_name("alternative") {
                    Some(alt) if alt.kind() == "block" => self.lower_block(alt),
                    Some(alt) if alt.kind() == "if_statement" => vec![self.lower_stmt(alt)],
                    _ => Vec::new(),
                };
                Stmt::If(IfStmt {
                    init,
                    cond,
                    then,
                    els,
                    pos: self.pos(node),
                    span: self.span(node),
                })
            }
            "return_statement" => {
                let results = node
                    .named_child(0)
                    .filter(|c| c.kind() == "expression_list")
                    .map(|list| self.lower_expr_list(Some(list)))
                    .unwrap_or_default();
                Stmt::Return(ReturnStmt {
                    results,
                    pos: self.pos(node),
                    span: self.span(node),
                })
            }
            "block" => Stmt::Block(self.lower_block(node)),
            _ => Stmt::Opaque,
        }
    }

    // --- Expressions ------------------------------------------------------

    fn lower_expr_list(&self, node: Option<Node>) -> Vec<Expr> {
        let Some(node) = node else {
            return Vec::new();
        };
        if node.kind() == "expression_list" {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .map(|child| self.lower_expr(child))
                .collect()
        } else {
            vec![self.lower_expr(node)]
        }
    }

    fn lower_expr(&self, node: Node) -> Expr {
        match node.kind() {
            "identifier" => Expr::Ident(Ident {
                name: self.text(node).to_string(),
                pos: self.pos(node),
                span: self.span(node),
            }),
            "nil" => Expr::Nil(self.pos(node), self.span(node)),
            "selector_expression" => {
                let base = node
                    .child_by_field_name("operand")
                    .map(|o| self.lower_expr(o))
                    .unwrap_or_else(|| self.opaque_expr(node));
                let field = node
                    .child_by_field_name("field")
                    .map(|f| self.text(f).to_string())
                    .unwrap_or_default();
                Expr::Selector(SelectorExpr {
                    base: Box::new(base),
                    field,
                    pos: self.pos(node),
                    span: self.span(node),
                })
            }
            "call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .map(|f| self.lower_expr(f))
                    .unwrap_or_else(|| self.opaque_expr(node));
                let args = node
                    .child_by_field_name("arguments")
                    .map(|a| {
                        let mut cursor = a.walk();
                        a.named_children(&mut cursor)
                            .map(|arg| self.lower_expr(arg))
                            .collect()
                    })
                    .unwrap_or_default();
                Expr::Call(CallExpr {
                    callee: Box::new(callee),
                    args,
                    pos: self.pos(node),
                    span: self.span(node),
                })
            }
            "interpreted_string_literal" => Expr::StringLit(StringLit {
                value: unquote(self.text(node)),
                pos: self.pos(node),
                span: self.span(node),
            }),
            "raw_string_literal" => Expr::StringLit(StringLit {
                value: self.text(node).trim_matches('`').to_string(),
                pos: self.pos(node),
                span: self.span(node),
            }),
            "type_assertion_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.lower_expr(o))
                    .unwrap_or_else(|| self.opaque_expr(node));
                let type_text = node
                    .child_by_field_name("type")
                    .map(|t| self.text(t).to_string())
                    .unwrap_or_default();
                Expr::TypeAssert(TypeAssertExpr {
                    operand: Box::new(operand),
                    type_text,
                    pos: self.pos(node),
                    span: self.span(node),
                })
            }
            "binary_expression" => {
                let left = node
                    .child_by_field_name("left")
                    .map(|l| self.lower_expr(l))
                    .unwrap_or_else(|| self.opaque_expr(node));
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o).to_string())
                    .unwrap_or_default();
                let right = node
                    .child_by_field_name("right")
                    .map(|r| self.lower_expr(r))
                    .unwrap_or_else(|| self.opaque_expr(node));
                Expr::Binary(BinaryExpr {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    pos: self.pos(node),
                    span: self.span(node),
                })
            }
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.lower_expr(inner),
                None => self.opaque_expr(node),
            },
            _ => self.opaque_expr(node),
        }
    }

    fn opaque_expr(&self, node: Node) -> Expr {
        Expr::Opaque(OpaqueExpr {
            text: self.text(node).split_whitespace().collect::<Vec<_>>().join(" "),
            pos: self.pos(node),
            span: self.span(node),
        })
    }
}

fn first_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn unquote(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '`').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(src: &str) -> SourceUnit {
        parse_unit(&PathBuf::from("snippet.go"), src).unwrap()
    }

    #[test]
    fn test_parses_package_and_imports() {
        let unit = parse(
            r#"package demo

import (
    "fmt"
    myio "io"
)

func touch() error { return nil }
"#,
        );
        assert_eq!(unit.package, "demo");
        assert_eq!(unit.imports.len(), 2);
        assert_eq!(unit.resolve_import("fmt"), Some("fmt"));
        assert_eq!(unit.resolve_import("myio"), Some("io"));
        assert_eq!(unit.resolve_import("io"), None);
        assert_eq!(unit.funcs.len(), 1);
        assert!(unit.funcs[0].returns_error());
    }

    #[test]
    fn test_lowers_assign_if_return() {
        let unit = parse(
            r#"package demo

import "os"

func open(path string) error {
    f, err := os.Open(path)
    if err != nil {
        return err
    }
    _ = f
    return nil
}
"#,
        );
        let body = &unit.funcs[0].body;
        let Stmt::Assign(assign) = &body[0] else {
            panic!("expected assignment, got {:?}", body[0]);
        };
        assert!(assign.define);
        assert_eq!(assign.lhs.len(), 2);
        assert_eq!(assign.lhs[1].as_ident(), Some("err"));
        assert_eq!(assign.rhs.len(), 1);

        let Stmt::If(iff) = &body[1] else {
            panic!("expected if, got {:?}", body[1]);
        };
        let Expr::Binary(cond) = &iff.cond else {
            panic!("expected binary cond");
        };
        assert_eq!(cond.op, "!=");
        assert_eq!(cond.left.as_ident(), Some("err"));
        assert!(cond.right.is_nil());
        assert!(matches!(iff.then[0], Stmt::Return(_)));
    }

    #[test]
    fn test_lowers_method_receiver_and_results() {
        let unit = parse(
            r#"package demo

type Store struct{}

func (s *Store) Close() (int, error) {
    return 0, nil
}
"#,
        );
        let func = &unit.funcs[0];
        assert_eq!(func.name, "Close");
        assert_eq!(func.receiver.as_deref(), Some("Store"));
        assert_eq!(func.results.len(), 2);
        assert!(func.returns_error());
        assert!(!func.error_before_last());
    }

    #[test]
    fn test_named_error_return() {
        let unit = parse(
            r#"package demo

func run() (n int, retErr error) {
    return
}
"#,
        );
        let func = &unit.funcs[0];
        assert_eq!(func.named_error_returns(), vec!["retErr"]);
    }

    #[test]
    fn test_collects_package_sentinels() {
        let unit = parse(
            r#"package demo

import "errors"

var ErrClosed = errors.New("closed")
var limit = 10

func touch() error { return nil }
"#,
        );
        assert_eq!(unit.package_sentinels, vec!["ErrClosed".to_string()]);
    }

    #[test]
    fn test_if_initializer_and_else_if() {
        let unit = parse(
            r#"package demo

import "os"

func stat(path string) error {
    if _, err := os.Stat(path); err != nil {
        return err
    } else if path == "" {
        return nil
    }
    return nil
}
"#,
        );
        let Stmt::If(iff) = &unit.funcs[0].body[0] else {
            panic!("expected if");
        };
        assert!(iff.init.is_some());
        assert_eq!(iff.els.len(), 1);
        assert!(matches!(iff.els[0], Stmt::If(_)));
    }

    #[test]
    fn test_string_and_call_lowering() {
        let unit = parse(
            r#"package demo

import "fmt"

func fail() error {
    return fmt.Errorf("boom: %w", inner())
}

func inner() error { return nil }
"#,
        );
        let Stmt::Return(ret) = &unit.funcs[0].body[0] else {
            panic!("expected return");
        };
        let Expr::Call(call) = &ret.results[0] else {
            panic!("expected call");
        };
        assert_eq!(call.callee.as_selector_path(), Some(("fmt", "Errorf")));
        let Expr::StringLit(lit) = &call.args[0] else {
            panic!("expected string literal");
        };
        assert_eq!(lit.value, "boom: %w");
    }
}

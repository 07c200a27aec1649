//! CIR translation.
//!
//! Lowers the reduced syntax tree of one file into the error-relevant
//! statement skeleton of each function. Classification decisions (wrapper vs
//! constructor, locality, sentinel vs alias) are driven by the registry and
//! the unit's resolution tables, degrading to conservative defaults where
//! type information is missing.

use std::collections::HashSet;

use tracing::debug;

use crate::cir::{
    Assign, Check, Cond, Function, If, Log, LogLevel, Node, Position, Program, Reference,
    Return, Source, Span, Wrap,
};
use crate::registry::{Registry, WrapKind};
use crate::report::PhaseReporter;
use crate::rules::Rule;
use crate::syntax::{AssignStmt, Expr, ExprStmt, FuncDecl, IfStmt, ReturnStmt, SourceUnit, Stmt};

/// Translates one compilation unit into CIR.
pub struct Translator<'a> {
    registry: &'a Registry,
    reporter: PhaseReporter<'a>,
}

/// Per-function translation state: tracked error variables and synthesized
/// name accounting.
struct FuncState {
    func_name: String,
    returns_error: bool,
    named_error_return: Option<String>,
    err_vars: HashSet<String>,
    synth_used: usize,
}

impl FuncState {
    fn new(func: &FuncDecl) -> Self {
        let mut err_vars = HashSet::new();
        for name in func.named_error_returns() {
            err_vars.insert(name.to_string());
        }
        Self {
            func_name: func.name.clone(),
            returns_error: func.returns_error(),
            named_error_return: func.named_error_returns().first().map(|s| s.to_string()),
            err_vars,
            synth_used: 0,
        }
    }

    fn mark(&mut self, name: &str) {
        if name != "_" {
            self.err_vars.insert(name.to_string());
        }
    }

    fn is_err_var(&self, name: &str) -> bool {
        self.err_vars.contains(name)
    }

    /// A name looks error-flavored even before any classification.
    fn erroish(&self, name: &str) -> bool {
        self.is_err_var(name) || name == "err" || name.to_lowercase().ends_with("err")
    }

    /// Invent a fresh synthesized name: `@err`, then `@err<Func>`,
    /// `@err<Func>2`, ...
    fn invent(&mut self) -> String {
        self.synth_used += 1;
        let name = if self.synth_used == 1 && !self.is_err_var("@err") {
            "@err".to_string()
        } else {
            let camel = camel(&self.func_name);
            if self.synth_used == 2 {
                format!("@err{camel}")
            } else {
                format!("@err{camel}{}", self.synth_used - 1)
            }
        };
        self.err_vars.insert(name.clone());
        name
    }
}

/// Outcome of matching a call against the wrapper/constructor tables.
enum CallClass {
    Wrap {
        via: String,
        msg: String,
        inner: Option<usize>,
    },
    Ctor {
        via: String,
        msg: String,
    },
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a Registry, reporter: PhaseReporter<'a>) -> Self {
        Self { registry, reporter }
    }

    /// Translate the whole unit. Bodies of functions that do not return an
    /// error are still walked so the tracker can fire CER050; such functions
    /// never receive `Return` nodes.
    pub fn translate(&self, unit: &SourceUnit) -> Program {
        let mut program = Program {
            file: unit.file.clone(),
            functions: Vec::new(),
        };
        for func in &unit.funcs {
            program.functions.push(self.translate_func(unit, func));
        }
        program
    }

    fn translate_func(&self, unit: &SourceUnit, func: &FuncDecl) -> Function {
        debug!(function = %func.name, "translating function");
        if func.error_before_last() {
            self.reporter.report(
                Rule::ErrorMustBeLastReturnValue,
                format!("function {} declares an error result before the last slot", func.name),
                func.pos.clone(),
            );
        }

        let mut st = FuncState::new(func);
        let nodes = self.walk(unit, &mut st, &func.body);
        Function {
            name: func.name.clone(),
            returns_error: st.returns_error,
            nodes,
        }
    }

    fn walk(&self, unit: &SourceUnit, st: &mut FuncState, stmts: &[Stmt]) -> Vec<Node> {
        let mut out = Vec::new();
        for stmt in stmts {
            match stmt {
                Stmt::Assign(assign) => out.extend(self.on_assign(unit, st, assign)),
                Stmt::Expr(expr) => out.extend(self.on_expr(unit, st, expr)),
                Stmt::If(iff) => out.extend(self.on_if(unit, st, iff)),
                Stmt::Return(ret) => out.extend(self.on_return(unit, st, ret)),
                Stmt::Block(inner) => out.extend(self.walk(unit, st, inner)),
                Stmt::Opaque => {}
            }
        }
        out
    }

    // --- Assignments ------------------------------------------------------

    fn on_assign(&self, unit: &SourceUnit, st: &mut FuncState, assign: &AssignStmt) -> Vec<Node> {
        let pos = assign.pos.clone();
        let span = assign.span;

        // Single LHS, single RHS call: wrapper or constructor first.
        if assign.lhs.len() == 1 && assign.rhs.len() == 1 {
            if let (Some(name), Expr::Call(call)) = (assign.lhs[0].as_ident(), &assign.rhs[0]) {
                if name != "_" {
                    if let Some(class) = self.classify_call(unit, call, &pos) {
                        return self.emit_classified(unit, st, class, name, call, &pos, span);
                    }
                    if let Some(check) = self.match_checker(unit, st, call) {
                        return vec![Node::Check(check)];
                    }
                }
            }
        }

        // Multi-LHS from a single call: classify the error slot only.
        if assign.rhs.len() == 1 && assign.lhs.len() > 1 {
            if let Expr::Call(_) = &assign.rhs[0] {
                let last = assign.lhs.last().unwrap();
                if last.is_blank() {
                    let source = self.classify_source(unit, &assign.rhs[0]);
                    if !self.source_is_benign(&source) {
                        self.reporter.report(
                            Rule::NoSilentDrop,
                            "error result discarded into the blank identifier",
                            pos.clone(),
                        );
                    }
                    return vec![Node::Assign(Assign {
                        pos,
                        span,
                        name: "_".to_string(),
                        source,
                        discarded: true,
                    })];
                }
                if let Some(name) = last.as_ident() {
                    if st.erroish(name) {
                        let source = self.classify_source(unit, &assign.rhs[0]);
                        st.mark(name);
                        return vec![Node::Assign(Assign {
                            pos,
                            span,
                            name: name.to_string(),
                            source,
                            discarded: false,
                        })];
                    }
                }
                return Vec::new();
            }
        }

        // Parallel pairs: keep only the error-relevant ones.
        let mut out = Vec::new();
        for (i, lhs) in assign.lhs.iter().enumerate() {
            let Some(name) = lhs.as_ident() else { continue };
            if name == "_" {
                continue;
            }
            let Some(rhs) = assign.rhs.get(i) else { continue };

            let relevant = st.erroish(name)
                || matches!(rhs, Expr::TypeAssert(a) if a.type_text == "error"
                    || a.operand.as_ident().map(|o| st.is_err_var(o)).unwrap_or(false))
                || matches!(rhs.as_ident(), Some(target) if st.is_err_var(target))
                || self.sentinel_reference(unit, rhs).is_some();
            if !relevant {
                continue;
            }
            if rhs.is_nil() && !st.is_err_var(name) {
                continue;
            }

            let source = self.classify_source(unit, rhs);
            st.mark(name);
            out.push(Node::Assign(Assign {
                pos: pos.clone(),
                span,
                name: name.to_string(),
                source,
                discarded: false,
            }));
        }
        out
    }

    fn emit_classified(
        &self,
        unit: &SourceUnit,
        st: &mut FuncState,
        class: CallClass,
        name: &str,
        call: &crate::syntax::CallExpr,
        pos: &Position,
        span: Span,
    ) -> Vec<Node> {
        match class {
            CallClass::Ctor { via, msg } => {
                st.mark(name);
                vec![Node::Assign(Assign {
                    pos: pos.clone(),
                    span,
                    name: name.to_string(),
                    source: Source::Ctor { msg, via },
                    discarded: false,
                })]
            }
            CallClass::Wrap { via, msg, inner } => {
                let inner_expr = inner.and_then(|i| call.args.get(i));
                let source = match inner_expr {
                    Some(expr) => self.classify_source(unit, expr),
                    None => Source::Call {
                        callee: format!("{via}(…)"),
                        local: false,
                    },
                };
                st.mark(name);
                vec![
                    Node::Assign(Assign {
                        pos: pos.clone(),
                        span,
                        name: name.to_string(),
                        source,
                        discarded: false,
                    }),
                    Node::Wrap(Wrap {
                        pos: pos.clone(),
                        span,
                        name: name.to_string(),
                        msg,
                        via,
                    }),
                ]
            }
        }
    }

    // --- Expression statements --------------------------------------------

    fn on_expr(&self, unit: &SourceUnit, st: &mut FuncState, stmt: &ExprStmt) -> Vec<Node> {
        let Expr::Call(call) = &stmt.expr else {
            return Vec::new();
        };
        let pos = stmt.pos.clone();
        let span = stmt.span;

        let resolved = self.resolve_callee(unit, &call.callee);

        // Abandon calls terminate the flow; with an error argument in scope
        // they count as fatal logging.
        if let Some((reference, rendered)) = &resolved {
            if self.registry.abandon(reference).is_some() {
                let names = self.err_var_args(st, &call.args);
                let names = if names.is_empty() {
                    self.wrapped_err_args(st, &call.args)
                } else {
                    names
                };
                if names.is_empty() {
                    return Vec::new();
                }
                return vec![Node::Log(Log {
                    pos,
                    span,
                    names,
                    level: LogLevel::Fatal,
                    via: rendered.clone(),
                })];
            }
        }

        // Checker predicates.
        if let Some(check) = self.match_checker(unit, st, call) {
            return vec![Node::Check(check)];
        }

        // Loggers.
        if let Some((reference, rendered)) = &resolved {
            if let Some(level) = self.registry.logger(reference) {
                let names = self.err_var_args(st, &call.args);
                if !names.is_empty() {
                    return vec![Node::Log(Log {
                        pos,
                        span,
                        names,
                        level,
                        via: rendered.clone(),
                    })];
                }
            }
        }

        Vec::new()
    }

    fn err_var_args(&self, st: &FuncState, args: &[Expr]) -> Vec<String> {
        args.iter()
            .filter_map(|a| a.as_ident())
            .filter(|name| st.is_err_var(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// Error variables hidden inside wrapper-call arguments, as in
    /// `panic(fmt.Errorf("...: %w", err))`.
    fn wrapped_err_args(&self, st: &FuncState, args: &[Expr]) -> Vec<String> {
        let mut out = Vec::new();
        for arg in args {
            if let Expr::Call(call) = arg {
                for inner in &call.args {
                    if let Some(name) = inner.as_ident() {
                        if st.is_err_var(name) {
                            out.push(name.to_string());
                        }
                    }
                }
            }
        }
        out
    }

    fn match_checker(
        &self,
        unit: &SourceUnit,
        st: &FuncState,
        call: &crate::syntax::CallExpr,
    ) -> Option<Check> {
        let (reference, _rendered) = self.resolve_callee(unit, &call.callee)?;
        let configured = self.registry.checker(&reference)?.clone();

        let mut exact = false;
        let class = if configured.is_any_class() {
            // Class comes from the predicate's second argument.
            exact = reference.name == "As";
            call.args
                .get(1)
                .and_then(|arg| self.sentinel_reference(unit, arg))
                .unwrap_or(configured)
        } else {
            configured
        };

        Some(Check {
            pos: call.pos.clone(),
            span: call.span,
            names: self.err_var_args(st, &call.args),
            args: call.args.iter().map(|a| a.render()).collect(),
            predicate: reference,
            class,
            exact,
        })
    }

    // --- If statements ----------------------------------------------------

    fn on_if(&self, unit: &SourceUnit, st: &mut FuncState, iff: &IfStmt) -> Vec<Node> {
        let mut out = Vec::new();
        if let Some(init) = &iff.init {
            out.extend(self.walk(unit, st, std::slice::from_ref(init.as_ref())));
        }

        // A recognized predicate in condition position is still a check.
        if let Expr::Call(call) = &iff.cond {
            if let Some(check) = self.match_checker(unit, st, call) {
                out.push(Node::Check(check));
            }
        }

        let cond = self.classify_cond(unit, st, &iff.cond);
        let then = self.walk(unit, st, &iff.then);
        let els = self.walk(unit, st, &iff.els);
        out.push(Node::If(If {
            pos: iff.pos.clone(),
            span: iff.span,
            cond,
            then,
            els,
        }));
        out
    }

    fn classify_cond(&self, unit: &SourceUnit, st: &FuncState, cond: &Expr) -> Cond {
        if let Expr::Binary(binary) = cond {
            let (ident_side, other) = match (binary.left.as_ident(), binary.right.as_ident()) {
                (Some(name), _) if st.is_err_var(name) => (Some(name), binary.right.as_ref()),
                (_, Some(name)) if st.is_err_var(name) => (Some(name), binary.left.as_ref()),
                _ => (None, binary.right.as_ref()),
            };
            if let Some(name) = ident_side {
                match (binary.op.as_str(), other.is_nil()) {
                    ("!=", true) => return Cond::NotNil(name.to_string()),
                    ("==", true) => return Cond::IsNil(name.to_string()),
                    (op @ ("==" | "!="), false) => {
                        if let Some(sentinel) = self.sentinel_reference(unit, other) {
                            let rendered = other.render();
                            let name = name.to_string();
                            return if op == "==" {
                                Cond::EqSentinel {
                                    name,
                                    sentinel,
                                    rendered,
                                }
                            } else {
                                Cond::NeqSentinel {
                                    name,
                                    sentinel,
                                    rendered,
                                }
                            };
                        }
                    }
                    _ => {}
                }
            }
        }
        Cond::Opaque(cond.render())
    }

    // --- Returns ----------------------------------------------------------

    fn on_return(&self, unit: &SourceUnit, st: &mut FuncState, ret: &ReturnStmt) -> Vec<Node> {
        if !st.returns_error {
            return Vec::new();
        }
        let Some(last) = ret.results.last() else {
            return Vec::new();
        };
        if last.is_nil() {
            // Success returns are omitted.
            return Vec::new();
        }
        let pos = ret.pos.clone();
        let span = ret.span;

        match last {
            Expr::Call(call) => {
                if let Some(class) = self.classify_call(unit, call, &pos) {
                    let name = match &class {
                        CallClass::Wrap { inner, .. } => inner
                            .and_then(|i| call.args.get(i))
                            .and_then(|e| e.as_ident())
                            .map(|s| s.to_string())
                            .or_else(|| st.named_error_return.clone())
                            .unwrap_or_else(|| st.invent()),
                        CallClass::Ctor { .. } => st
                            .named_error_return
                            .clone()
                            .unwrap_or_else(|| st.invent()),
                    };
                    let mut out = self.emit_classified(unit, st, class, &name, call, &pos, span);
                    out.push(Node::Return(Return { pos, span, name }));
                    return out;
                }
                // Plain call propagated as the error result.
                let source = self.classify_source(unit, last);
                let name = st
                    .named_error_return
                    .clone()
                    .unwrap_or_else(|| st.invent());
                st.mark(&name);
                vec![
                    Node::Assign(Assign {
                        pos: pos.clone(),
                        span,
                        name: name.clone(),
                        source,
                        discarded: false,
                    }),
                    Node::Return(Return { pos, span, name }),
                ]
            }
            Expr::Ident(ident) => {
                if st.is_err_var(&ident.name) {
                    return vec![Node::Return(Return {
                        pos,
                        span,
                        name: ident.name.clone(),
                    })];
                }
                if st.erroish(&ident.name) || unit.package_sentinels.contains(&ident.name) {
                    let source = self.classify_source(unit, last);
                    st.mark(&ident.name);
                    return vec![
                        Node::Assign(Assign {
                            pos: pos.clone(),
                            span,
                            name: ident.name.clone(),
                            source,
                            discarded: false,
                        }),
                        Node::Return(Return {
                            pos,
                            span,
                            name: ident.name.clone(),
                        }),
                    ];
                }
                Vec::new()
            }
            Expr::Selector(_) => {
                let Some(_) = self.sentinel_reference(unit, last) else {
                    return Vec::new();
                };
                let source = self.classify_source(unit, last);
                let name = st
                    .named_error_return
                    .clone()
                    .unwrap_or_else(|| st.invent());
                st.mark(&name);
                vec![
                    Node::Assign(Assign {
                        pos: pos.clone(),
                        span,
                        name: name.clone(),
                        source,
                        discarded: false,
                    }),
                    Node::Return(Return { pos, span, name }),
                ]
            }
            Expr::TypeAssert(_) => {
                let source = self.classify_source(unit, last);
                let name = st
                    .named_error_return
                    .clone()
                    .unwrap_or_else(|| st.invent());
                st.mark(&name);
                vec![
                    Node::Assign(Assign {
                        pos: pos.clone(),
                        span,
                        name: name.clone(),
                        source,
                        discarded: false,
                    }),
                    Node::Return(Return { pos, span, name }),
                ]
            }
            _ => Vec::new(),
        }
    }

    // --- Classification ---------------------------------------------------

    /// Match a call against wrapper and constructor tables, emitting the
    /// format-string reports along the way.
    fn classify_call(
        &self,
        unit: &SourceUnit,
        call: &crate::syntax::CallExpr,
        pos: &Position,
    ) -> Option<CallClass> {
        let (reference, rendered) = self.resolve_callee(unit, &call.callee)?;

        if let Some(kind) = self.registry.wrapper(&reference) {
            match kind {
                WrapKind::Format => {
                    let format = call.args.first();
                    let literal = match format {
                        Some(Expr::StringLit(lit)) => Some(lit.value.clone()),
                        Some(_) => {
                            self.reporter.report(
                                Rule::AnnotationFormatMustBeLiteral,
                                "",
                                pos.clone(),
                            );
                            None
                        }
                        None => None,
                    };
                    match literal {
                        Some(text) if text.contains("%w") => {
                            if !text.ends_with(": %w") {
                                self.reporter.report(
                                    Rule::AnnotationFormatMustEndWithW,
                                    "",
                                    pos.clone(),
                                );
                            }
                            let inner = if call.args.len() > 1 {
                                Some(call.args.len() - 1)
                            } else {
                                None
                            };
                            self.check_error_operand(call, inner, pos);
                            return Some(CallClass::Wrap {
                                via: rendered,
                                msg: normalize_wrap_msg(&text),
                                inner,
                            });
                        }
                        Some(text) => {
                            // No %w: a constructor when registered as one.
                            if self.registry.is_constructor(&reference) {
                                return Some(CallClass::Ctor {
                                    via: rendered,
                                    msg: text,
                                });
                            }
                            return None;
                        }
                        None => {
                            // Non-literal format still produces a wrap node
                            // with a placeholder message.
                            let inner = if call.args.len() > 1 {
                                Some(call.args.len() - 1)
                            } else {
                                None
                            };
                            self.check_error_operand(call, inner, pos);
                            return Some(CallClass::Wrap {
                                via: rendered,
                                msg: String::new(),
                                inner,
                            });
                        }
                    }
                }
                WrapKind::Errors => {
                    let msg = match call.args.get(1) {
                        Some(Expr::StringLit(lit)) => lit.value.clone(),
                        _ => String::new(),
                    };
                    let inner = if call.args.is_empty() { None } else { Some(0) };
                    self.check_error_operand(call, inner, pos);
                    return Some(CallClass::Wrap {
                        via: rendered,
                        msg,
                        inner,
                    });
                }
            }
        }

        if self.registry.is_constructor(&reference) {
            let msg = match call.args.first() {
                Some(Expr::StringLit(lit)) => lit.value.clone(),
                _ => String::new(),
            };
            return Some(CallClass::Ctor {
                via: rendered,
                msg,
            });
        }

        None
    }

    fn check_error_operand(
        &self,
        call: &crate::syntax::CallExpr,
        inner: Option<usize>,
        pos: &Position,
    ) {
        if let Some(expr) = inner.and_then(|i| call.args.get(i)) {
            if expr.as_ident().is_none() && !expr.is_nil() {
                self.reporter.report(
                    Rule::FixBeforeUse,
                    "error operand must be a variable, not an inline expression",
                    pos.clone(),
                );
            }
        }
    }

    /// Classify an error-valued expression into a CIR source.
    fn classify_source(&self, unit: &SourceUnit, expr: &Expr) -> Source {
        match expr {
            Expr::Call(call) => match self.resolve_callee(unit, &call.callee) {
                Some((reference, rendered)) => {
                    let local = if reference.package == unit.package {
                        true
                    } else {
                        unit.is_local_package(&reference.package)
                    };
                    Source::Call {
                        callee: render_call(&rendered, call.args.len()),
                        local,
                    }
                }
                None => Source::Call {
                    callee: render_call(&call.callee.render(), call.args.len()),
                    local: false,
                },
            },
            Expr::Ident(ident) => {
                if unit.package_sentinels.contains(&ident.name) {
                    Source::Sentinel {
                        symbol: Reference::func(unit.package.clone(), ident.name.clone()),
                        rendered: ident.name.clone(),
                        local: true,
                    }
                } else {
                    Source::Alias {
                        target: ident.name.clone(),
                    }
                }
            }
            Expr::Selector(_) => match self.sentinel_reference(unit, expr) {
                Some(symbol) => {
                    let local = unit.is_local_package(&symbol.package);
                    Source::Sentinel {
                        symbol,
                        rendered: expr.render(),
                        local,
                    }
                }
                None => Source::Call {
                    callee: expr.render(),
                    local: false,
                },
            },
            Expr::TypeAssert(_) => Source::TypeAssert {
                expr: expr.render(),
            },
            Expr::Nil(..) => Source::Nil,
            _ => Source::Call {
                callee: expr.render(),
                local: false,
            },
        }
    }

    /// A selector shaped like a package-level error value.
    fn sentinel_reference(&self, unit: &SourceUnit, expr: &Expr) -> Option<Reference> {
        let (base, field) = expr.as_selector_path()?;
        let path = unit.resolve_import(base)?;
        let reference = Reference::func(path, field);
        let looks_like_error = field.starts_with("Err")
            || field == "EOF"
            || self.registry.is_benign_sentinel(&reference);
        looks_like_error.then_some(reference)
    }

    /// Resolve a callee expression to a reference plus its rendered form.
    fn resolve_callee(&self, unit: &SourceUnit, callee: &Expr) -> Option<(Reference, String)> {
        if let Some((base, field)) = callee.as_selector_path() {
            if let Some(path) = unit.resolve_import(base) {
                return Some((Reference::func(path, field), format!("{base}.{field}")));
            }
            // A method call on a value; the declaring package is unknown.
            return None;
        }
        if let Some(name) = callee.as_ident() {
            if matches!(name, "panic" | "print" | "println") {
                return Some((Reference::func("builtin", name), name.to_string()));
            }
            return Some((Reference::func(unit.package.clone(), name), name.to_string()));
        }
        None
    }

    fn source_is_benign(&self, source: &Source) -> bool {
        match source {
            Source::Sentinel { symbol, .. } => self.registry.is_benign_sentinel(symbol),
            _ => false,
        }
    }
}

fn render_call(callee: &str, arg_count: usize) -> String {
    if arg_count == 0 {
        format!("{callee}()")
    } else {
        format!("{callee}(…)")
    }
}

/// Strip trailing wrap-verb variations and surrounding whitespace. A `%w`
/// stuck in the middle of the format leaves the prefix before it.
fn normalize_wrap_msg(msg: &str) -> String {
    let mut m = msg.trim();
    let mut stripped_suffix = false;
    for suffix in [": %w", " %w", "(%w)"] {
        if let Some(stripped) = m.strip_suffix(suffix) {
            m = stripped;
            stripped_suffix = true;
            break;
        }
    }
    if !stripped_suffix {
        if let Some(index) = m.find("%w") {
            m = m[..index].trim_end_matches([':', ' ', '(']);
        }
    }
    m.trim().to_string()
}

fn camel(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Phase, Reporter};
    use crate::syntax::parse_unit;
    use std::path::PathBuf;

    fn translate(src: &str) -> (Program, Vec<crate::report::Report>) {
        let unit = parse_unit(&PathBuf::from("snippet.go"), src).unwrap();
        let registry = Registry::defaults();
        let reporter = Reporter::new();
        let translator = Translator::new(&registry, reporter.phase(Phase::Translation));
        let program = translator.translate(&unit);
        (program, reporter.snapshot())
    }

    #[test]
    fn test_normalize_wrap_msg() {
        assert_eq!(normalize_wrap_msg("read stream: %w"), "read stream");
        assert_eq!(normalize_wrap_msg("read %w"), "read");
        assert_eq!(normalize_wrap_msg("read(%w)"), "read");
        assert_eq!(normalize_wrap_msg("oops %w here"), "oops");
        assert_eq!(normalize_wrap_msg("  spaced: %w  "), "spaced");
    }

    #[test]
    fn test_wrap_and_return_scenario() {
        let (program, reports) = translate(
            r#"package demo

import (
    "fmt"
    "io"
)

func read(r io.Reader) error {
    buf := make([]byte, 16)
    _, err := r.Read(buf)
    if err != nil {
        return fmt.Errorf("read stream: %w", err)
    }
    return nil
}
"#,
        );
        assert!(reports.is_empty(), "unexpected reports: {reports:?}");
        let text = program.pretty(true);
        assert!(text.contains("If \"err != nil\":"), "pretty:\n{text}");
        assert!(text.contains("Assign [err] <- err"), "pretty:\n{text}");
        assert!(
            text.contains("Wrap [err] msg=\"read stream\" (via fmt.Errorf)"),
            "pretty:\n{text}"
        );
        assert!(text.contains("Return [err]"), "pretty:\n{text}");
        // The success return emits nothing.
        assert!(!text.contains("Return [nil]"));
    }

    #[test]
    fn test_constructor_vs_wrap_discrimination() {
        let (program, reports) = translate(
            r#"package demo

import "fmt"

func fail() error {
    return fmt.Errorf("bad %d", 7)
}
"#,
        );
        assert!(reports.is_empty());
        let text = program.pretty(true);
        assert!(
            text.contains("Assign [@err] <- NewError msg=\"bad %d\" (via fmt.Errorf)"),
            "pretty:\n{text}"
        );
        assert!(text.contains("Return [@err]"));
    }

    #[test]
    fn test_blank_discard_reports_cer000() {
        let (program, reports) = translate(
            r#"package demo

import "os"

func touch(path string) error {
    _, _ = os.Create(path)
    return nil
}
"#,
        );
        let text = program.pretty(true);
        assert!(text.contains("Assign [_]"), "pretty:\n{text}");
        assert!(reports
            .iter()
            .any(|r| r.rule == Some(Rule::NoSilentDrop)));
    }

    #[test]
    fn test_logger_and_checker_nodes() {
        let (program, _) = translate(
            r#"package demo

import (
    "errors"
    "fmt"
    "io"
    "os"
)

func probe(path string) error {
    _, err := os.Open(path)
    if err != nil {
        fmt.Println("open failed", err)
        os.IsNotExist(err)
        errors.Is(err, io.EOF)
    }
    return nil
}
"#,
        );
        let text = program.pretty(true);
        assert!(text.contains("Log [err] level=warn (via fmt.Println)"), "pretty:\n{text}");
        assert!(
            text.contains("Check [err] class=os.ErrNotExist (via os.IsNotExist)"),
            "pretty:\n{text}"
        );
        assert!(
            text.contains("Check [err] class=io.EOF (via errors.Is)"),
            "pretty:\n{text}"
        );
    }

    #[test]
    fn test_wrapper_format_must_be_literal() {
        let (program, reports) = translate(
            r#"package demo

import "fmt"

func fail(format string, err error) error {
    return fmt.Errorf(format, err)
}
"#,
        );
        assert!(reports
            .iter()
            .any(|r| r.rule == Some(Rule::AnnotationFormatMustBeLiteral)));
        // A wrap node is still emitted with a placeholder message.
        let text = program.pretty(true);
        assert!(text.contains("Wrap ["), "pretty:\n{text}");
    }

    #[test]
    fn test_wrapper_format_must_end_with_w() {
        let (program, reports) = translate(
            r#"package demo

import "fmt"

func fail(err error) error {
    return fmt.Errorf("oops %w here: %v", err, err)
}
"#,
        );
        assert!(reports
            .iter()
            .any(|r| r.rule == Some(Rule::AnnotationFormatMustEndWithW)));
        let text = program.pretty(true);
        assert!(text.contains("Wrap ["), "pretty:\n{text}");
    }

    #[test]
    fn test_error_before_last_return_value() {
        let (_, reports) = translate(
            r#"package demo

func swap() (error, int) {
    return nil, 0
}
"#,
        );
        assert!(reports
            .iter()
            .any(|r| r.rule == Some(Rule::ErrorMustBeLastReturnValue)));
    }

    #[test]
    fn test_errors_kind_wrapper() {
        let (program, _) = translate(
            r#"package demo

import (
    "os"

    "github.com/pkg/errors"
)

func open(path string) error {
    f, err := os.Open(path)
    if err != nil {
        wrapped := errors.Wrap(err, "open data file")
        return wrapped
    }
    _ = f
    return nil
}
"#,
        );
        let text = program.pretty(true);
        assert!(
            text.contains("Wrap [wrapped] msg=\"open data file\" (via errors.Wrap)"),
            "pretty:\n{text}"
        );
    }

    #[test]
    fn test_translation_is_deterministic() {
        let src = r#"package demo

import (
    "fmt"
    "os"
)

func run() error {
    _, err := os.Open("x")
    if err != nil {
        return fmt.Errorf("open: %w", err)
    }
    return nil
}
"#;
        let (a, _) = translate(src);
        let (b, _) = translate(src);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_function_body_empty_cir() {
        let (program, reports) = translate(
            r#"package demo

func noop() error {
    return nil
}

func empty() {}
"#,
        );
        assert!(reports.is_empty());
        for function in &program.functions {
            assert!(function.nodes.is_empty());
        }
    }

    #[test]
    fn test_panic_with_error_is_fatal_log() {
        let (program, _) = translate(
            r#"package demo

import "os"

func mustOpen(path string) error {
    _, err := os.Open(path)
    if err != nil {
        panic(err)
    }
    return nil
}
"#,
        );
        let text = program.pretty(true);
        assert!(text.contains("Log [err] level=fatal (via panic)"), "pretty:\n{text}");
    }

    #[test]
    fn test_aliasing_scenario() {
        let (program, _) = translate(
            r#"package demo

import (
    "fmt"
    "os"
)

func home() error {
    _, oldErr := os.UserHomeDir()
    if oldErr != nil {
        newErr := oldErr
        return fmt.Errorf("get home: %w", newErr)
    }
    return nil
}
"#,
        );
        let text = program.pretty(true);
        assert!(text.contains("Assign [newErr] <- oldErr"), "pretty:\n{text}");
        assert!(text.contains("Assign [newErr] <- newErr"), "pretty:\n{text}");
        assert!(
            text.contains("Wrap [newErr] msg=\"get home\" (via fmt.Errorf)"),
            "pretty:\n{text}"
        );
        assert!(text.contains("Return [newErr]"), "pretty:\n{text}");
    }
}

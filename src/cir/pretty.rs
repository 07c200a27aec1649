//! Debug-only pretty printer for CIR programs.

use std::fmt::Write as _;

use super::{Function, Node, Program, Source};

impl Program {
    /// Render the program for inspection. `indented_blocks` selects the
    /// indentation-based form; otherwise a braced form is produced.
    pub fn pretty(&self, indented_blocks: bool) -> String {
        let mut out = String::new();
        for function in &self.functions {
            render_function(&mut out, function, indented_blocks);
        }
        out
    }
}

fn render_function(out: &mut String, function: &Function, indented_blocks: bool) {
    if indented_blocks {
        let _ = writeln!(out, "Function {}:", function.name);
    } else {
        let _ = writeln!(out, "Function {} {{", function.name);
    }
    for node in &function.nodes {
        render_node(out, node, 1, indented_blocks);
    }
    if indented_blocks {
        out.push('\n');
    } else {
        out.push_str("}\n\n");
    }
}

fn render_node(out: &mut String, node: &Node, indent: usize, indented_blocks: bool) {
    let ind = "  ".repeat(indent);
    match node {
        Node::Assign(x) => {
            let _ = match &x.source {
                Source::Ctor { msg, via } if via.is_empty() => {
                    writeln!(out, "{ind}Assign [{}] <- NewError msg={msg:?}", x.name)
                }
                Source::Ctor { msg, via } => {
                    writeln!(out, "{ind}Assign [{}] <- NewError msg={msg:?} (via {via})", x.name)
                }
                Source::Call { callee, local } => {
                    let flavor = if *local { "local call" } else { "foreign call" };
                    writeln!(out, "{ind}Assign [{}] <- {callee} ({flavor})", x.name)
                }
                Source::Sentinel { rendered, local, .. } => {
                    let flavor = if *local { "local sentinel" } else { "foreign sentinel" };
                    writeln!(out, "{ind}Assign [{}] <- {rendered} ({flavor})", x.name)
                }
                Source::Alias { target } => {
                    writeln!(out, "{ind}Assign [{}] <- {target}", x.name)
                }
                Source::TypeAssert { expr } => {
                    writeln!(out, "{ind}Assign [{}] <- {expr}", x.name)
                }
                Source::Nil => writeln!(out, "{ind}Assign [{}] <- nil", x.name),
            };
        }
        Node::Wrap(x) => {
            let _ = writeln!(out, "{ind}Wrap [{}] msg={:?} (via {})", x.name, x.msg, x.via);
        }
        Node::Return(x) => {
            let _ = writeln!(out, "{ind}Return [{}]", x.name);
        }
        Node::Log(x) => {
            let _ = writeln!(
                out,
                "{ind}Log {} level={} (via {})",
                bracket_vars(&x.names),
                x.level,
                x.via
            );
        }
        Node::Check(x) => {
            let vars = if x.names.is_empty() {
                format!("{:?}", x.args)
            } else {
                bracket_vars(&x.names)
            };
            let _ = writeln!(
                out,
                "{ind}Check {} class={} (via {})",
                vars,
                x.class.short(),
                x.predicate.short()
            );
        }
        Node::If(x) => {
            let cond = x.cond.render();
            if indented_blocks {
                let _ = writeln!(out, "{ind}If {cond:?}:");
                for t in &x.then {
                    render_node(out, t, indent + 1, indented_blocks);
                }
                if !x.els.is_empty() {
                    let _ = writeln!(out, "{ind}Else:");
                    for e in &x.els {
                        render_node(out, e, indent + 1, indented_blocks);
                    }
                }
            } else {
                let _ = writeln!(out, "{ind}If {cond:?} {{");
                for t in &x.then {
                    render_node(out, t, indent + 1, indented_blocks);
                }
                if !x.els.is_empty() {
                    let _ = writeln!(out, "{ind}}} else {{");
                    for e in &x.els {
                        render_node(out, e, indent + 1, indented_blocks);
                    }
                }
                let _ = writeln!(out, "{ind}}}");
            }
        }
    }
}

fn bracket_vars(vars: &[String]) -> String {
    format!("[{}]", vars.join(" "))
}

#[cfg(test)]
mod tests {
    use super::super::{Assign, Cond, If, Log, LogLevel, Position, Return, Span, Wrap};
    use super::*;

    fn pos() -> Position {
        Position::default()
    }

    fn span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn test_pretty_wrap_and_return() {
        let prog = Program {
            file: "snippet.go".to_string(),
            functions: vec![Function {
                name: "read".to_string(),
                returns_error: true,
                nodes: vec![
                    Node::Assign(Assign {
                        pos: pos(),
                        span: span(),
                        name: "err".to_string(),
                        source: Source::Call {
                            callee: "io.ReadAll(…)".to_string(),
                            local: false,
                        },
                        discarded: false,
                    }),
                    Node::If(If {
                        pos: pos(),
                        span: span(),
                        cond: Cond::NotNil("err".to_string()),
                        then: vec![
                            Node::Wrap(Wrap {
                                pos: pos(),
                                span: span(),
                                name: "err".to_string(),
                                msg: "read stream".to_string(),
                                via: "fmt.Errorf".to_string(),
                            }),
                            Node::Return(Return {
                                pos: pos(),
                                span: span(),
                                name: "err".to_string(),
                            }),
                        ],
                        els: vec![],
                    }),
                ],
            }],
        };

        let text = prog.pretty(true);
        assert!(text.contains("Function read:"));
        assert!(text.contains("Assign [err] <- io.ReadAll(…) (foreign call)"));
        assert!(text.contains("If \"err != nil\":"));
        assert!(text.contains("Wrap [err] msg=\"read stream\" (via fmt.Errorf)"));
        assert!(text.contains("Return [err]"));
    }

    #[test]
    fn test_pretty_ctor_and_log() {
        let prog = Program {
            file: "s.go".to_string(),
            functions: vec![Function {
                name: "f".to_string(),
                returns_error: true,
                nodes: vec![
                    Node::Assign(Assign {
                        pos: pos(),
                        span: span(),
                        name: "@err".to_string(),
                        source: Source::Ctor {
                            msg: "bad %d".to_string(),
                            via: "fmt.Errorf".to_string(),
                        },
                        discarded: false,
                    }),
                    Node::Log(Log {
                        pos: pos(),
                        span: span(),
                        names: vec!["@err".to_string()],
                        level: LogLevel::Warn,
                        via: "fmt.Println".to_string(),
                    }),
                ],
            }],
        };
        let text = prog.pretty(true);
        assert!(text.contains("Assign [@err] <- NewError msg=\"bad %d\" (via fmt.Errorf)"));
        assert!(text.contains("Log [@err] level=warn (via fmt.Println)"));
    }
}

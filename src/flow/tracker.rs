//! Path-sensitive fact tracking over the control-flow graph.
//!
//! The tracker walks basic blocks depth-first with an explicit stack. Each
//! frame owns a cloned state, successors get independent clones, and blocks
//! are processed at most once per distinct state fingerprint. There is no
//! join operator; a configurable live-frame budget bounds path explosion.

use std::collections::HashSet;

use tracing::debug;

use crate::cir::{Cond, Function, LogLevel, Node, Position};
use crate::registry::Registry;
use crate::report::{Phase, PhaseReporter, Reporter};
use crate::rules::Rule;
use crate::span::SpanIndex;

use super::cfg::{Branch, Cfg, Inst};
use super::facts::{ClassStatus, Fact, NotNilStatus, Origin, State, TakenCareStatus};

/// Knobs for the tracker.
#[derive(Debug, Clone, Copy)]
pub struct TrackerOptions {
    /// Maximum number of live DFS frames before the function's analysis is
    /// abandoned with a trace diagnostic.
    pub fork_budget: usize,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self { fork_budget: 256 }
    }
}

/// Interprets one function's CFG and fires flow rules.
pub struct Tracker<'a> {
    registry: &'a Registry,
    trace: PhaseReporter<'a>,
    state_phase: PhaseReporter<'a>,
    options: TrackerOptions,
}

struct Frame {
    block: usize,
    state: State,
}

impl<'a> Tracker<'a> {
    pub fn new(registry: &'a Registry, reporter: &'a Reporter, options: TrackerOptions) -> Self {
        Self {
            registry,
            trace: reporter.phase(Phase::Trace),
            state_phase: reporter.phase(Phase::State),
            options,
        }
    }

    /// Track every path through `function`, using `index` to anchor
    /// end-of-function reports to the innermost covering CIR node.
    pub fn track(&self, function: &Function, index: &SpanIndex<Node>) {
        if function.nodes.is_empty() {
            return;
        }
        debug!(function = %function.name, "tracking function");

        let cfg = Cfg::build(function);
        let return_sites = function.error_return_sites();

        let mut frames = vec![Frame {
            block: cfg.entry,
            state: State::new(),
        }];
        let mut visited: HashSet<(usize, String)> = HashSet::new();
        let mut terminal: Vec<State> = Vec::new();

        while let Some(frame) = frames.pop() {
            if frames.len() >= self.options.fork_budget {
                self.trace.diagnostic(
                    format!(
                        "fork budget of {} live paths exceeded in {}; analysis truncated",
                        self.options.fork_budget, function.name
                    ),
                    function
                        .nodes
                        .first()
                        .map(|n| n.pos().clone())
                        .unwrap_or_default(),
                );
                return;
            }
            if !visited.insert((frame.block, frame.state.fingerprint())) {
                continue;
            }

            let mut state = frame.state;
            let block = &cfg.blocks[frame.block];
            let mut terminated = false;
            for inst in &block.insts {
                match self.apply(inst, &mut state, return_sites) {
                    Ok(true) => {}
                    Ok(false) => {
                        terminated = true;
                        break;
                    }
                    Err(message) => {
                        self.trace.diagnostic(
                            format!("dropping analysis of {}: {message}", function.name),
                            inst.pos().clone(),
                        );
                        return;
                    }
                }
            }
            if terminated || block.succs.is_empty() {
                terminal.push(state);
                continue;
            }

            match (&block.branch, block.succs.as_slice()) {
                (Some(branch), [then_succ, else_succ]) => {
                    let mut then_state = state.clone();
                    let mut else_state = state;
                    self.refine(branch, &mut then_state, true);
                    self.refine(branch, &mut else_state, false);
                    frames.push(Frame {
                        block: *else_succ,
                        state: else_state,
                    });
                    frames.push(Frame {
                        block: *then_succ,
                        state: then_state,
                    });
                }
                (_, succs) => {
                    let mut rest = succs.iter().rev();
                    if let Some(last) = rest.next() {
                        for succ in rest {
                            frames.push(Frame {
                                block: *succ,
                                state: state.clone(),
                            });
                        }
                        frames.push(Frame {
                            block: *last,
                            state,
                        });
                    }
                }
            }
        }

        self.finish(function, index, &terminal);
    }

    // --- Instruction interpretation ---------------------------------------

    fn apply(&self, inst: &Inst, state: &mut State, return_sites: usize) -> Result<bool, String> {
        match inst {
            Inst::Assign(assign) => {
                if assign.discarded {
                    // Already reported at translation time.
                    return Ok(true);
                }
                self.apply_assign(assign, state);
                Ok(true)
            }
            Inst::Wrap(wrap) => {
                let fact = state
                    .fact_mut(&wrap.name)
                    .ok_or_else(|| format!("wrap of unbound error variable {}", wrap.name))?;
                fact.set_wrapped();
                Ok(true)
            }
            Inst::Return(ret) => {
                let fact = state
                    .fact_mut(&ret.name)
                    .ok_or_else(|| format!("return of unbound error variable {}", ret.name))?;
                fact.propagation_paths += 1;
                if fact.benign {
                    fact.set_taken_care(true);
                    return Ok(false);
                }
                if fact.not_nil == Some(false) {
                    self.trace.report(
                        Rule::ReturnInDefinedErrorState,
                        format!("{} is proven nil on this path", ret.name),
                        ret.pos.clone(),
                    );
                }
                match fact.set_taken_care(true) {
                    TakenCareStatus::AlreadyLogged => {
                        self.trace.report(
                            Rule::NoLogAndReturn,
                            format!("{} was logged and is now returned", ret.name),
                            ret.pos.clone(),
                        );
                    }
                    TakenCareStatus::AlreadyReturned => {
                        self.trace.report(
                            Rule::NoLogAndReturn,
                            format!("{} is returned twice on this path", ret.name),
                            ret.pos.clone(),
                        );
                    }
                    TakenCareStatus::Ok => {
                        if !fact.wrapped {
                            let origin = fact.origin;
                            self.check_bare_return(origin, &ret.name, &ret.pos, return_sites);
                        }
                    }
                }
                Ok(false)
            }
            Inst::Log(log) => {
                for name in &log.names {
                    if !state.is_bound(name) {
                        state.bind(name, Fact::new(Origin::Alias, log.pos.clone()));
                    }
                    let Some(fact) = state.fact_mut(name) else {
                        continue;
                    };
                    fact.propagation_paths += 1;
                    match fact.set_taken_care(false) {
                        TakenCareStatus::AlreadyLogged => {
                            self.trace.report(
                                Rule::NoLogAndReturn,
                                format!("{name} is logged twice on this path"),
                                log.pos.clone(),
                            );
                        }
                        TakenCareStatus::AlreadyReturned => {
                            self.trace.report(
                                Rule::NoLogAndReturn,
                                format!("{name} was returned and is now logged"),
                                log.pos.clone(),
                            );
                        }
                        TakenCareStatus::Ok => {}
                    }
                }
                // Fatal logging abandons the flow.
                Ok(log.level != LogLevel::Fatal)
            }
            Inst::Check(check) => {
                for name in &check.names {
                    if !state.is_bound(name) {
                        state.bind(name, Fact::new(Origin::Alias, check.pos.clone()));
                    }
                    let Some(fact) = state.fact_mut(name) else {
                        continue;
                    };
                    let status = fact.set_class(check.class.clone(), check.exact);
                    self.report_class_status(status, name, check, &check.pos);
                }
                Ok(true)
            }
        }
    }

    fn apply_assign(&self, assign: &crate::cir::Assign, state: &mut State) {
        use crate::cir::Source;
        match &assign.source {
            Source::Alias { target } => {
                if *target == assign.name {
                    // Self-alias produced by return-site lowering keeps the
                    // existing fact.
                    if !state.is_bound(&assign.name) {
                        state.bind(&assign.name, Fact::new(Origin::Alias, assign.pos.clone()));
                    }
                } else {
                    self.trace.report(
                        Rule::NoShadowingOrAliasing,
                        format!("{} aliases tracked error {}", assign.name, target),
                        assign.pos.clone(),
                    );
                    state.alias(
                        &assign.name,
                        target,
                        Fact::new(Origin::Alias, assign.pos.clone()),
                    );
                }
            }
            Source::Sentinel { symbol, local, .. } => {
                let mut fact = Fact::new(Origin::Sentinel { local: *local }, assign.pos.clone());
                fact.not_nil = Some(true);
                fact.benign = self.registry.is_benign_sentinel(symbol);
                state.bind(&assign.name, fact);
            }
            Source::Ctor { .. } => {
                let mut fact = Fact::new(Origin::Ctor, assign.pos.clone());
                fact.not_nil = Some(true);
                state.bind(&assign.name, fact);
            }
            Source::Call { local, .. } => {
                let origin = if *local {
                    Origin::LocalCall
                } else {
                    Origin::ExternalCall
                };
                state.bind(&assign.name, Fact::new(origin, assign.pos.clone()));
            }
            Source::TypeAssert { .. } => {
                state.bind(&assign.name, Fact::new(Origin::TypeAssert, assign.pos.clone()));
            }
            Source::Nil => {
                let mut fact = Fact::new(Origin::Nil, assign.pos.clone());
                fact.not_nil = Some(false);
                state.bind(&assign.name, fact);
            }
        }
    }

    /// The bare-return decision table: pass-through is the single local
    /// case; everything else needs annotation or counts as delegation.
    fn check_bare_return(&self, origin: Origin, name: &str, pos: &Position, return_sites: usize) {
        match origin {
            o if o.is_local() => {
                if return_sites > 1 {
                    self.trace.report(
                        Rule::MultiReturnMustAnnotate,
                        format!(
                            "{name} propagated bare from one of {return_sites} error return sites"
                        ),
                        pos.clone(),
                    );
                }
            }
            Origin::ExternalCall => {
                if return_sites > 1 {
                    self.trace.report(
                        Rule::AnnotationRequiredForExternalAndMultiLocal,
                        format!("external error {name} propagated bare"),
                        pos.clone(),
                    );
                } else {
                    self.trace.report(
                        Rule::NoErrorDelegation,
                        format!("{name} forwards a callee's error without local interpretation"),
                        pos.clone(),
                    );
                }
            }
            Origin::Sentinel { local: false } => {
                if return_sites > 1 {
                    self.trace.report(
                        Rule::AnnotationRequiredForExternalAndMultiLocal,
                        format!("foreign sentinel {name} propagated bare"),
                        pos.clone(),
                    );
                } else {
                    self.trace.report(
                        Rule::AnnotateExternal,
                        format!("foreign sentinel {name} crosses a semantic boundary bare"),
                        pos.clone(),
                    );
                }
            }
            _ => {}
        }
    }

    fn report_class_status(
        &self,
        status: ClassStatus,
        name: &str,
        check: &crate::cir::Check,
        pos: &Position,
    ) {
        let class = check.class.short();
        match status {
            ClassStatus::Ok => {}
            ClassStatus::Duplicate => self.trace.report(
                Rule::TextAndStyleRules,
                format!("duplicate {class} check of {name}"),
                pos.clone(),
            ),
            ClassStatus::DuplicateUpgrade => self.trace.report(
                Rule::TextAndStyleRules,
                format!("exact {class} check of {name} after a belongs-to check; use the exact predicate from the start"),
                pos.clone(),
            ),
            ClassStatus::DuplicateDowngrade => self.trace.report(
                Rule::TextAndStyleRules,
                format!("belongs-to {class} check of {name} after an exact match is a no-op"),
                pos.clone(),
            ),
            ClassStatus::ExactImpossible => self.trace.report(
                Rule::TextAndStyleRules,
                format!("{name} cannot be an exact {class} while already exact of another class"),
                pos.clone(),
            ),
        }
    }

    // --- Branch refinement ------------------------------------------------

    /// Refine facts for one arm of a branch. Hygiene findings (duplicate and
    /// contradictory checks) are reported only on the arm that states the
    /// predicate literally; the opposite arm refines silently.
    fn refine(&self, branch: &Branch, state: &mut State, taking_then: bool) {
        match &branch.cond {
            Cond::NotNil(name) => {
                self.refine_not_nil(state, name, taking_then, taking_then, &branch.pos);
            }
            Cond::IsNil(name) => {
                self.refine_not_nil(state, name, !taking_then, taking_then, &branch.pos);
            }
            Cond::EqSentinel { name, sentinel, .. } => {
                if taking_then {
                    self.ensure_bound(state, name, &branch.pos);
                    if let Some(fact) = state.fact_mut(name) {
                        let _ = fact.set_not_nil(true);
                        let status = fact.set_class(sentinel.clone(), true);
                        self.report_sentinel_status(status, name, sentinel, &branch.pos);
                    }
                }
            }
            Cond::NeqSentinel { name, sentinel, .. } => {
                if !taking_then {
                    self.ensure_bound(state, name, &branch.pos);
                    if let Some(fact) = state.fact_mut(name) {
                        let _ = fact.set_not_nil(true);
                        let _ = fact.set_class(sentinel.clone(), true);
                    }
                }
            }
            Cond::Opaque(_) => {}
        }
    }

    fn refine_not_nil(
        &self,
        state: &mut State,
        name: &str,
        value: bool,
        report: bool,
        pos: &Position,
    ) {
        self.ensure_bound(state, name, pos);
        let Some(fact) = state.fact_mut(name) else {
            return;
        };
        match fact.set_not_nil(value) {
            NotNilStatus::Ok => {}
            NotNilStatus::Duplicate => {
                if report {
                    self.trace.report(
                        Rule::TextAndStyleRules,
                        format!("duplicate nil check of {name}"),
                        pos.clone(),
                    );
                }
            }
            NotNilStatus::Contradict => {
                if report {
                    self.trace.report(
                        Rule::TextAndStyleRules,
                        format!("contradictory nil check of {name}"),
                        pos.clone(),
                    );
                }
            }
        }
    }

    fn report_sentinel_status(
        &self,
        status: ClassStatus,
        name: &str,
        sentinel: &crate::cir::Reference,
        pos: &Position,
    ) {
        let class = sentinel.short();
        match status {
            ClassStatus::Ok => {}
            ClassStatus::Duplicate => self.trace.report(
                Rule::TextAndStyleRules,
                format!("duplicate {class} comparison of {name}"),
                pos.clone(),
            ),
            ClassStatus::DuplicateUpgrade => self.trace.report(
                Rule::TextAndStyleRules,
                format!("{class} comparison of {name} after a belongs-to check"),
                pos.clone(),
            ),
            ClassStatus::DuplicateDowngrade | ClassStatus::ExactImpossible => self.trace.report(
                Rule::TextAndStyleRules,
                format!("conflicting {class} comparison of {name}"),
                pos.clone(),
            ),
        }
    }

    fn ensure_bound(&self, state: &mut State, name: &str, pos: &Position) {
        if !state.is_bound(name) {
            state.bind(name, Fact::new(Origin::Alias, pos.clone()));
        }
    }

    // --- End of function --------------------------------------------------

    /// Silent-drop analysis over the terminal states of all paths.
    fn finish(&self, function: &Function, index: &SpanIndex<Node>, terminal: &[State]) {
        let mut reported: HashSet<(String, usize)> = HashSet::new();
        for state in terminal {
            for (names, fact) in state.facts() {
                if fact.is_taken_care() || fact.benign {
                    continue;
                }
                if fact.origin == Origin::Nil || fact.not_nil == Some(false) {
                    continue;
                }
                let Some(name) = names.first() else { continue };
                let key = (name.to_string(), fact.introduced_at.offset);
                if !reported.insert(key) {
                    continue;
                }
                let pos = index
                    .find(fact.introduced_at.offset)
                    .map(|node| node.pos().clone())
                    .unwrap_or_else(|| fact.introduced_at.clone());
                if function.returns_error {
                    self.state_phase.report(
                        Rule::NoSilentDrop,
                        format!("error {name} is dropped without logging or returning"),
                        pos,
                    );
                } else {
                    self.state_phase.report(
                        Rule::HandleInNonErrorFunc,
                        format!("error {name} in a non-error function is never handled"),
                        pos,
                    );
                }
            }
        }
    }
}

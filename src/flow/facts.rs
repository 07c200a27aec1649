//! Per-variable error facts and the flow state.
//!
//! A `Fact` records everything the tracker knows about one error variable on
//! the current path. A `State` maps variable names to facts through a
//! union-find forest so aliased variables share one fact and mutations
//! propagate in both directions.

use std::collections::{BTreeMap, HashMap};

use crate::cir::{Position, Reference};

/// Ownership status of an error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakenCare {
    Logged,
    Returned,
}

/// How the variable was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    LocalCall,
    ExternalCall,
    Sentinel { local: bool },
    Alias,
    Ctor,
    TypeAssert,
    Nil,
}

impl Origin {
    /// Locally-originated values qualify for the bare pass-through case.
    pub fn is_local(&self) -> bool {
        match self {
            Origin::LocalCall | Origin::Ctor | Origin::TypeAssert | Origin::Nil | Origin::Alias => {
                true
            }
            Origin::Sentinel { local } => *local,
            Origin::ExternalCall => false,
        }
    }
}

/// Result of recording a nil-ness observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotNilStatus {
    Ok,
    /// The same check was already established in an enclosing scope.
    Duplicate,
    /// The observation contradicts the established value.
    Contradict,
}

/// Result of a `taken_care` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakenCareStatus {
    Ok,
    AlreadyLogged,
    AlreadyReturned,
}

/// Result of recording a class observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassStatus {
    Ok,
    /// The same class at the same exactness was recorded before.
    Duplicate,
    /// A belongs-to observation is being upgraded to an exact one.
    DuplicateUpgrade,
    /// An exact observation is being weakened to belongs-to.
    DuplicateDowngrade,
    /// A second class cannot be exact at the same time as an existing one.
    ExactImpossible,
}

/// Everything known about one error variable on the current path.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub not_nil: Option<bool>,
    pub taken_care: Option<TakenCare>,
    pub wrapped: bool,
    pub class_of: HashMap<Reference, bool>,
    pub origin: Origin,
    /// Origin is a benign sentinel; the value may be dropped silently.
    pub benign: bool,
    pub propagation_paths: u32,
    pub introduced_at: Position,
}

impl Fact {
    pub fn new(origin: Origin, introduced_at: Position) -> Self {
        Self {
            not_nil: None,
            taken_care: None,
            wrapped: false,
            class_of: HashMap::new(),
            origin,
            benign: false,
            propagation_paths: 0,
            introduced_at,
        }
    }

    /// Record the result of a `!= nil` / `== nil` observation.
    pub fn set_not_nil(&mut self, is_not_nil: bool) -> NotNilStatus {
        match self.not_nil {
            None => {
                self.not_nil = Some(is_not_nil);
                NotNilStatus::Ok
            }
            Some(prev) if prev == is_not_nil => NotNilStatus::Duplicate,
            Some(_) => {
                self.not_nil = Some(is_not_nil);
                NotNilStatus::Contradict
            }
        }
    }

    /// Transition ownership; `returned` selects returned over logged.
    pub fn set_taken_care(&mut self, returned: bool) -> TakenCareStatus {
        match self.taken_care {
            Some(TakenCare::Returned) => TakenCareStatus::AlreadyReturned,
            Some(TakenCare::Logged) => TakenCareStatus::AlreadyLogged,
            None => {
                self.taken_care = Some(if returned {
                    TakenCare::Returned
                } else {
                    TakenCare::Logged
                });
                TakenCareStatus::Ok
            }
        }
    }

    /// Record a class observation; `exact` marks exact-match predicates.
    pub fn set_class(&mut self, class: Reference, exact: bool) -> ClassStatus {
        match self.class_of.get(&class).copied() {
            None => {
                if exact && self.class_of.values().any(|&e| e) {
                    return ClassStatus::ExactImpossible;
                }
                self.class_of.insert(class, exact);
                ClassStatus::Ok
            }
            Some(prev) => match (prev, exact) {
                (false, true) => ClassStatus::DuplicateUpgrade,
                (true, false) => ClassStatus::DuplicateDowngrade,
                _ => ClassStatus::Duplicate,
            },
        }
    }

    pub fn set_wrapped(&mut self) {
        self.wrapped = true;
    }

    pub fn is_taken_care(&self) -> bool {
        self.taken_care.is_some()
    }

    pub fn is_logged(&self) -> bool {
        self.taken_care == Some(TakenCare::Logged)
    }

    pub fn is_returned(&self) -> bool {
        self.taken_care == Some(TakenCare::Returned)
    }

    fn fingerprint_into(&self, out: &mut String) {
        use std::fmt::Write as _;
        let _ = write!(
            out,
            "n{:?}t{:?}w{}o{:?}b{}",
            self.not_nil, self.taken_care, self.wrapped, self.origin, self.benign
        );
        let mut classes: Vec<_> = self.class_of.iter().collect();
        classes.sort();
        for (class, exact) in classes {
            let _ = write!(out, "c{class}={exact}");
        }
    }
}

/// One union-find slot. The fact lives at the root of each set.
#[derive(Debug, Clone)]
struct Slot {
    parent: Option<usize>,
    fact: Option<Fact>,
}

/// Flow state: per-variable facts with alias sharing.
#[derive(Debug, Clone, Default)]
pub struct State {
    slots: Vec<Slot>,
    vars: HashMap<String, usize>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    fn root_of(&self, mut slot: usize) -> usize {
        while let Some(parent) = self.slots[slot].parent {
            slot = parent;
        }
        slot
    }

    /// Bind `name` to a fresh fact, shadowing any previous binding. Other
    /// names aliased to the previous fact keep it.
    pub fn bind(&mut self, name: &str, fact: Fact) {
        let slot = self.slots.len();
        self.slots.push(Slot {
            parent: None,
            fact: Some(fact),
        });
        self.vars.insert(name.to_string(), slot);
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn fact(&self, name: &str) -> Option<&Fact> {
        let slot = *self.vars.get(name)?;
        let root = self.root_of(slot);
        self.slots[root].fact.as_ref()
    }

    pub fn fact_mut(&mut self, name: &str) -> Option<&mut Fact> {
        let slot = *self.vars.get(name)?;
        let root = self.root_of(slot);
        self.slots[root].fact.as_mut()
    }

    /// Union `name` with `target` so both resolve to one shared fact.
    /// `target` gets an implicit fact when it is unbound. A union of two
    /// already-connected variables is a no-op, which makes alias cycles
    /// converge immediately.
    pub fn alias(&mut self, name: &str, target: &str, origin_fact: Fact) {
        if !self.vars.contains_key(target) {
            self.bind(target, origin_fact);
        }
        let target_root = self.root_of(self.vars[target]);
        match self.vars.get(name).copied() {
            Some(existing) => {
                let existing_root = self.root_of(existing);
                if existing_root == target_root {
                    return;
                }
                // The alias target's fact wins; the old fact is discarded
                // for this set.
                self.slots[existing_root].fact = None;
                self.slots[existing_root].parent = Some(target_root);
            }
            None => {
                let slot = self.slots.len();
                self.slots.push(Slot {
                    parent: Some(target_root),
                    fact: None,
                });
                self.vars.insert(name.to_string(), slot);
            }
        }
    }

    /// Distinct facts with the variable names bound to each, sorted for
    /// deterministic iteration.
    pub fn facts(&self) -> Vec<(Vec<&str>, &Fact)> {
        let mut by_root: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        let mut names: Vec<(&String, &usize)> = self.vars.iter().collect();
        names.sort();
        for (name, slot) in names {
            by_root
                .entry(self.root_of(*slot))
                .or_default()
                .push(name.as_str());
        }
        by_root
            .into_iter()
            .filter_map(|(root, names)| self.slots[root].fact.as_ref().map(|f| (names, f)))
            .collect()
    }

    /// A stable digest of the visible state, used to bound re-processing of
    /// CFG blocks.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        for (names, fact) in self.facts() {
            out.push_str(&names.join(","));
            out.push(':');
            fact.fingerprint_into(&mut out);
            out.push(';');
        }
        out
    }
}

//! Flow-sensitive fact tracking.
//!
//! Builds a control-flow graph per translated function and interprets it
//! path-sensitively, maintaining per-error-variable facts and firing rule
//! violations.

pub mod cfg;
pub mod facts;
mod tracker;

pub use cfg::{Block, Branch, Cfg, Inst};
pub use facts::{ClassStatus, Fact, NotNilStatus, Origin, State, TakenCare, TakenCareStatus};
pub use tracker::{Tracker, TrackerOptions};

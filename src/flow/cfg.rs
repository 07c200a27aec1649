//! Control-flow graph over CIR functions.
//!
//! Linear runs of nodes form basic blocks; an `If` ends its block with a
//! branch and two successors that rejoin afterwards. `Return` nodes and
//! fatal-level logs terminate their block with no successors.

use crate::cir::{Assign, Check, Cond, Function, Log, LogLevel, Node, Position, Return, Wrap};

pub type BlockId = usize;

/// A non-branching instruction.
#[derive(Debug, Clone)]
pub enum Inst {
    Assign(Assign),
    Wrap(Wrap),
    Return(Return),
    Log(Log),
    Check(Check),
}

impl Inst {
    pub fn pos(&self) -> &Position {
        match self {
            Inst::Assign(x) => &x.pos,
            Inst::Wrap(x) => &x.pos,
            Inst::Return(x) => &x.pos,
            Inst::Log(x) => &x.pos,
            Inst::Check(x) => &x.pos,
        }
    }
}

/// The condition splitting a block into then/else successors.
#[derive(Debug, Clone)]
pub struct Branch {
    pub cond: Cond,
    pub pos: Position,
}

/// A basic block: ordered instructions plus outgoing edges. When `branch`
/// is set the block has two successors, in then/else order.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub insts: Vec<Inst>,
    pub branch: Option<Branch>,
    pub succs: Vec<BlockId>,
}

/// The function's control-flow graph.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub blocks: Vec<Block>,
    pub entry: BlockId,
}

impl Cfg {
    /// Lower the nested CIR statement structure into basic blocks.
    pub fn build(function: &Function) -> Self {
        let mut builder = Builder {
            blocks: vec![Block::default()],
        };
        builder.lower_seq(&function.nodes, 0);
        Cfg {
            blocks: builder.blocks,
            entry: 0,
        }
    }
}

struct Builder {
    blocks: Vec<Block>,
}

impl Builder {
    fn new_block(&mut self) -> BlockId {
        self.blocks.push(Block::default());
        self.blocks.len() - 1
    }

    /// Emit a node sequence starting at `entry`. Returns the block control
    /// falls out of and whether that exit is reachable.
    fn lower_seq(&mut self, nodes: &[Node], entry: BlockId) -> (BlockId, bool) {
        let mut current = entry;
        let mut alive = true;
        for node in nodes {
            if !alive {
                // Anything after a terminator is unreachable; give it a
                // fresh block with no predecessors so it never runs.
                current = self.new_block();
                alive = true;
            }
            match node {
                Node::If(iff) => {
                    let then_entry = self.new_block();
                    let (then_exit, then_alive) = self.lower_seq(&iff.then, then_entry);

                    let else_edge = if iff.els.is_empty() {
                        None
                    } else {
                        let else_entry = self.new_block();
                        Some((else_entry, self.lower_seq(&iff.els, else_entry)))
                    };

                    let join = self.new_block();
                    self.blocks[current].branch = Some(Branch {
                        cond: iff.cond.clone(),
                        pos: iff.pos.clone(),
                    });
                    match else_edge {
                        Some((else_entry, (else_exit, else_alive))) => {
                            self.blocks[current].succs = vec![then_entry, else_entry];
                            if then_alive {
                                self.blocks[then_exit].succs.push(join);
                            }
                            if else_alive {
                                self.blocks[else_exit].succs.push(join);
                            }
                        }
                        None => {
                            // The else edge falls straight through to join.
                            self.blocks[current].succs = vec![then_entry, join];
                            if then_alive {
                                self.blocks[then_exit].succs.push(join);
                            }
                        }
                    }
                    current = join;
                }
                Node::Return(ret) => {
                    self.blocks[current].insts.push(Inst::Return(ret.clone()));
                    alive = false;
                }
                Node::Log(log) => {
                    let fatal = log.level == LogLevel::Fatal;
                    self.blocks[current].insts.push(Inst::Log(log.clone()));
                    if fatal {
                        alive = false;
                    }
                }
                Node::Assign(assign) => {
                    self.blocks[current].insts.push(Inst::Assign(assign.clone()));
                }
                Node::Wrap(wrap) => {
                    self.blocks[current].insts.push(Inst::Wrap(wrap.clone()));
                }
                Node::Check(check) => {
                    self.blocks[current].insts.push(Inst::Check(check.clone()));
                }
            }
        }
        (current, alive)
    }
}

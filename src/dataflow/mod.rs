//! A generic monotone data-flow solver parameterized by direction, so the
//! forward (constant propagation) and backward (live variables) analyses
//! in `§4.C` share one engine instead of two hand-written worklists.

pub mod const_prop;
pub mod live_vars;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    ir::{CfgEdge, Method, StmtId, StmtKind},
    lattice::MeetSemilattice,
};

/// The direction a data-flow analysis runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// An intraprocedural monotone data-flow analysis: a fact lattice plus the
/// boundary/initial facts and per-statement transfer function `§4.C`
/// describes.
pub trait DataflowAnalysis {
    type Fact: MeetSemilattice;

    fn direction(&self) -> Direction;

    /// The fact installed on the boundary side (entry for forward, exit
    /// for backward) before iteration begins.
    fn boundary_fact(&self, method: &Method) -> Self::Fact;

    /// The fact every non-boundary node starts with.
    fn initial_fact(&self) -> Self::Fact {
        Self::Fact::bottom()
    }

    /// Computes the far-side fact (`OUT` for forward, `IN` for backward)
    /// from the near-side fact and the statement itself.
    fn transfer(&self, stmt_id: StmtId, stmt: &StmtKind, near: &Self::Fact) -> Self::Fact;
}

/// The per-statement result of running a [`DataflowAnalysis`] to a fixed
/// point: the fact immediately before (`IN`) and immediately after
/// (`OUT`) the statement.
#[derive(Debug, Clone)]
pub struct StmtFacts<F> {
    pub inn: F,
    pub out: F,
}

/// Runs `analysis` over `method` to a fixed point and returns the IN/OUT
/// facts at every statement.
///
/// # Panics
/// Panics if `method` has no body (is abstract).
pub fn solve<A: DataflowAnalysis>(
    analysis: &A,
    method: &Method,
) -> BTreeMap<StmtId, StmtFacts<A::Fact>> {
    let cfg = method.cfg().expect("solve requires a method body");
    let mut facts: BTreeMap<StmtId, StmtFacts<A::Fact>> = cfg
        .nodes()
        .map(|(id, _)| {
            (
                id,
                StmtFacts {
                    inn: analysis.initial_fact(),
                    out: analysis.initial_fact(),
                },
            )
        })
        .collect();

    let boundary = match analysis.direction() {
        Direction::Forward => cfg.entry_point(),
        Direction::Backward => {
            // Any exit works as *the* boundary node for a single-exit
            // convention; methods with multiple exits install the
            // boundary fact on each of them.
            cfg.exits()
                .next()
                .unwrap_or_else(|| cfg.entry_point())
        }
    };
    if let Some(f) = facts.get_mut(&boundary) {
        match analysis.direction() {
            Direction::Forward => f.inn = analysis.boundary_fact(method),
            Direction::Backward => f.out = analysis.boundary_fact(method),
        }
    }
    for exit in cfg.exits() {
        if matches!(analysis.direction(), Direction::Backward) {
            if let Some(f) = facts.get_mut(&exit) {
                f.out = analysis.boundary_fact(method);
            }
        }
    }

    let mut worklist: VecDeque<StmtId> = cfg.nodes().map(|(id, _)| id).collect();
    let mut queued: BTreeSet<StmtId> = worklist.iter().copied().collect();

    while let Some(stmt_id) = worklist.pop_front() {
        queued.remove(&stmt_id);
        let stmt = cfg.node(stmt_id).expect("node exists");

        match analysis.direction() {
            Direction::Forward => {
                let inn = meet_predecessors(analysis, cfg, &facts, stmt_id, &boundary);
                let out = analysis.transfer(stmt_id, stmt, &inn);
                let entry = facts.get_mut(&stmt_id).expect("fact exists");
                let changed = entry.inn != inn || entry.out != out;
                entry.inn = inn;
                entry.out = out;
                if changed {
                    for (succ, _) in cfg.edges_from(stmt_id) {
                        if queued.insert(succ) {
                            worklist.push_back(succ);
                        }
                    }
                }
            }
            Direction::Backward => {
                let out = meet_successors(analysis, cfg, &facts, stmt_id);
                let inn = analysis.transfer(stmt_id, stmt, &out);
                let entry = facts.get_mut(&stmt_id).expect("fact exists");
                let changed = entry.inn != inn || entry.out != out;
                entry.inn = inn;
                entry.out = out;
                if changed {
                    for (pred, _) in cfg.edges_into(stmt_id) {
                        if queued.insert(pred) {
                            worklist.push_back(pred);
                        }
                    }
                }
            }
        }
    }

    facts
}

fn meet_predecessors<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &crate::ir::ControlFlowGraph<StmtKind, CfgEdge>,
    facts: &BTreeMap<StmtId, StmtFacts<A::Fact>>,
    stmt_id: StmtId,
    boundary: &StmtId,
) -> A::Fact {
    if stmt_id == *boundary {
        return facts[&stmt_id].inn.clone();
    }
    let mut result = analysis.initial_fact();
    for (pred, _) in cfg.edges_into(stmt_id) {
        result = result.meet(&facts[&pred].out);
    }
    result
}

fn meet_successors<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &crate::ir::ControlFlowGraph<StmtKind, CfgEdge>,
    facts: &BTreeMap<StmtId, StmtFacts<A::Fact>>,
    stmt_id: StmtId,
) -> A::Fact {
    let is_exit = cfg.edges_from(stmt_id).next().is_none();
    if is_exit {
        return facts[&stmt_id].out.clone();
    }
    let mut result = analysis.initial_fact();
    for (succ, _) in cfg.edges_from(stmt_id) {
        result = result.meet(&facts[&succ].inn);
    }
    result
}

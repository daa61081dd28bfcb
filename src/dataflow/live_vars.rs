//! `§4.C.1` -- backward may-live-variable analysis.

use crate::{
    ir::{Method, StmtId, StmtKind},
    lattice::SetFact,
};

use super::{DataflowAnalysis, Direction};

/// `liveIn(s) = (liveOut(s) \ def(s)) ∪ use(s)`.
#[derive(Debug, Default)]
pub struct LiveVariables;

impl DataflowAnalysis for LiveVariables {
    type Fact = SetFact<crate::ir::VarId>;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn boundary_fact(&self, _method: &Method) -> Self::Fact {
        SetFact::new()
    }

    fn transfer(&self, _stmt_id: StmtId, stmt: &StmtKind, out: &Self::Fact) -> Self::Fact {
        let mut inn = out.clone();
        if let Some(def) = stmt.defines() {
            inn.remove(&def);
        }
        for used in stmt.uses() {
            inn.add(used);
        }
        inn
    }
}

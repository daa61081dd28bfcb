//! The result sink (`§6`): a typed store for named analysis outputs,
//! keyed by analysis id, so a CLI or a driver running several passes over
//! the same program has one place to stash and retrieve them.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    cha::CallGraph,
    dataflow::StmtFacts,
    interprop::InterPropResult,
    ir::{MethodId, StmtId, VarId},
    lattice::{CPFact, SetFact},
    pta::{ci::CiPtaResult, cs::CsPtaResult},
    taint::TaintFlow,
};

/// One named analysis output. A small closed enum rather than `dyn Any`:
/// the crate knows the full set of result shapes up front, so callers can
/// match on [`AnalysisOutput`] and get a concrete type back instead of
/// downcasting.
#[derive(Debug)]
pub enum AnalysisOutput {
    Cha(CallGraph<MethodId>),
    PtaContextInsensitive(CiPtaResult),
    PtaContextSensitive(CsPtaResult),
    ConstProp(BTreeMap<MethodId, BTreeMap<StmtId, StmtFacts<CPFact>>>),
    LiveVars(BTreeMap<MethodId, BTreeMap<StmtId, StmtFacts<SetFact<VarId>>>>),
    InterConstProp(InterPropResult),
    Taint(BTreeSet<TaintFlow>),
    DeadCode(BTreeMap<MethodId, BTreeSet<StmtId>>),
}

/// The well-known keys a driver stashes results under (`§6`).
pub const CHA: &str = "cha";
pub const PTA_CI: &str = "pta-ci";
pub const PTA_CS: &str = "pta-cs";
pub const INTER_CONSTPROP: &str = "inter-constprop";
pub const TAINT: &str = "taint";
pub const DEAD_CODE: &str = "dead-code";

/// A store for named analysis outputs, keyed by analysis id (`§6`).
#[derive(Debug, Default)]
pub struct AnalysisResults {
    outputs: BTreeMap<&'static str, AnalysisOutput>,
}

impl AnalysisResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &'static str, output: AnalysisOutput) {
        self.outputs.insert(id, output);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AnalysisOutput> {
        self.outputs.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.outputs.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_by_id() {
        let mut results = AnalysisResults::new();
        results.insert(TAINT, AnalysisOutput::Taint(BTreeSet::new()));
        assert!(matches!(results.get(TAINT), Some(AnalysisOutput::Taint(_))));
        assert!(results.get(CHA).is_none());
        assert_eq!(results.ids().collect::<Vec<_>>(), vec![TAINT]);
    }

    #[test]
    fn later_inserts_under_the_same_id_replace_the_previous_output() {
        let mut results = AnalysisResults::new();
        results.insert(DEAD_CODE, AnalysisOutput::DeadCode(BTreeMap::new()));
        let mut per_method = BTreeMap::new();
        per_method.insert(
            MethodId {
                declaring_class: crate::ir::ClassId::from("Main"),
                subsignature: crate::ir::Subsignature::new("main()"),
            },
            BTreeSet::from([StmtId(0)]),
        );
        results.insert(DEAD_CODE, AnalysisOutput::DeadCode(per_method));
        let Some(AnalysisOutput::DeadCode(stored)) = results.get(DEAD_CODE) else {
            panic!("expected a DeadCode output");
        };
        assert_eq!(stored.len(), 1);
    }
}

//! `§4.B` -- the class-hierarchy-analysis call-graph builder, and the
//! generic [`CallGraph`] shape reused (with a different node type) by the
//! pointer analyses in [`crate::pta`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    hierarchy::{ClassHierarchy, subsignature_of},
    ir::{CallKind, ClassId, Invoke, MethodId, MethodRef, StmtId, Subsignature},
};

/// A call site identified by its containing node (`M` is `MethodId` for
/// CHA/CI-PTA, or a context-tagged method for CS-PTA) plus statement
/// index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallSite<M> {
    pub caller: M,
    pub stmt: StmtId,
}

/// A call graph: nodes are methods; edges are `(call site, callee)`
/// pairs tagged with the dispatch [`CallKind`]. Generic over the node
/// type so the same shape backs CHA/CI-PTA (`M = MethodId`) and CS-PTA
/// (`M = CSMethod`).
#[derive(Debug, Clone)]
pub struct CallGraph<M> {
    entries: BTreeSet<M>,
    reachable: BTreeSet<M>,
    edges: BTreeMap<CallSite<M>, BTreeSet<(CallKind, M)>>,
    call_sites_of: BTreeMap<M, BTreeSet<StmtId>>,
}

impl<M: Ord + Clone> Default for CallGraph<M> {
    fn default() -> Self {
        Self {
            entries: BTreeSet::new(),
            reachable: BTreeSet::new(),
            edges: BTreeMap::new(),
            call_sites_of: BTreeMap::new(),
        }
    }
}

impl<M: Ord + Clone> CallGraph<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `m` an analysis entry point, and implicitly reachable.
    pub fn add_entry(&mut self, m: M) {
        self.entries.insert(m.clone());
        self.reachable.insert(m);
    }

    /// Marks `m` reachable; returns whether it was newly so.
    pub fn mark_reachable(&mut self, m: M) -> bool {
        self.reachable.insert(m)
    }

    #[must_use]
    pub fn is_reachable(&self, m: &M) -> bool {
        self.reachable.contains(m)
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = &M> {
        self.reachable.iter()
    }

    /// Adds a call-graph edge; returns whether it was new (`§3` invariant
    /// 3: call-graph edges persist once added).
    pub fn add_edge(&mut self, call_site: CallSite<M>, kind: CallKind, callee: M) -> bool {
        self.call_sites_of
            .entry(call_site.caller.clone())
            .or_default()
            .insert(call_site.stmt);
        self.edges
            .entry(call_site)
            .or_default()
            .insert((kind, callee))
    }

    #[must_use]
    pub fn call_sites_of(&self, m: &M) -> BTreeSet<StmtId> {
        self.call_sites_of.get(m).cloned().unwrap_or_default()
    }

    pub fn edges_at(&self, call_site: &CallSite<M>) -> impl Iterator<Item = &(CallKind, M)> {
        self.edges.get(call_site).into_iter().flatten()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&CallSite<M>, &(CallKind, M))> {
        self.edges
            .iter()
            .flat_map(|(cs, tgts)| tgts.iter().map(move |t| (cs, t)))
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeSet<M> {
        &self.entries
    }
}

/// `dispatch(C, sig)`: ascend from `class` while it declares no method of
/// `sig` or the declared method is abstract; returns the first concrete
/// declaration found, else `None` (`§4.B`, `§7` "missing dispatch
/// target" -- an empty result, never an error).
#[must_use]
pub fn dispatch(
    hierarchy: &ClassHierarchy<'_>,
    class: &ClassId,
    sig: &Subsignature,
) -> Option<MethodId> {
    let mut current = Some(class.clone());
    while let Some(c) = current {
        if let Some(id) = hierarchy.declared_method(&c, sig) {
            if !hierarchy.is_abstract(&id) {
                return Some(id);
            }
        }
        current = hierarchy.super_class_of(&c).cloned();
    }
    None
}

/// `resolve(callsite)` for `STATIC`/`SPECIAL` dispatch: a single target
/// via `dispatch` against the statically declared class.
#[must_use]
pub fn resolve_static_or_special(
    hierarchy: &ClassHierarchy<'_>,
    method_ref: &MethodRef,
) -> Option<MethodId> {
    dispatch(hierarchy, &method_ref.class, subsignature_of(method_ref))
}

/// `resolve(callsite)` for `VIRTUAL`/`INTERFACE` dispatch: every class
/// transitively reachable from the declared class via subclass/
/// subinterface/implementor edges, deduplicated via `dispatch`.
#[must_use]
pub fn resolve_virtual_or_interface(
    hierarchy: &ClassHierarchy<'_>,
    method_ref: &MethodRef,
) -> BTreeSet<MethodId> {
    let sig = subsignature_of(method_ref);
    let mut targets = BTreeSet::new();
    let mut seen_classes = BTreeSet::new();
    let mut queue = VecDeque::from([method_ref.class.clone()]);
    while let Some(class) = queue.pop_front() {
        if !seen_classes.insert(class.clone()) {
            continue;
        }
        if let Some(id) = dispatch(hierarchy, &class, sig) {
            targets.insert(id);
        }
        queue.extend(hierarchy.direct_subclasses_of(&class));
        queue.extend(hierarchy.direct_subinterfaces_of(&class));
        queue.extend(hierarchy.direct_implementors_of(&class));
    }
    targets
}

/// Resolves a single call site's callees according to its [`CallKind`].
#[must_use]
pub fn resolve(hierarchy: &ClassHierarchy<'_>, inv: &Invoke) -> BTreeSet<MethodId> {
    match inv.kind {
        CallKind::Static | CallKind::Special => resolve_static_or_special(hierarchy, &inv.method)
            .into_iter()
            .collect(),
        CallKind::Virtual | CallKind::Interface => resolve_virtual_or_interface(hierarchy, &inv.method),
    }
}

/// Builds a CHA call graph by worklist reachability from an entry method
/// (`§4.B`). Used when no pointer analysis is requested; a coarser but
/// much cheaper over-approximation than the PTA-driven call graphs.
#[derive(Debug)]
pub struct ChaBuilder<'p> {
    hierarchy: ClassHierarchy<'p>,
}

impl<'p> ChaBuilder<'p> {
    #[must_use]
    pub fn new(hierarchy: ClassHierarchy<'p>) -> Self {
        Self { hierarchy }
    }

    /// Runs the worklist reachability walk from `entry`, returning the
    /// call graph of all transitively reachable methods.
    #[must_use]
    pub fn build(&self, entry: MethodId) -> CallGraph<MethodId> {
        let mut cg = CallGraph::new();
        cg.add_entry(entry.clone());
        let mut worklist = VecDeque::from([entry]);
        while let Some(m) = worklist.pop_front() {
            let Some(method) = self.hierarchy.program().method(&m) else {
                continue;
            };
            for (stmt_id, inv) in method.invoke_sites() {
                let call_site = CallSite {
                    caller: m.clone(),
                    stmt: stmt_id,
                };
                for callee in resolve(&self.hierarchy, inv) {
                    let edge_is_new = cg.add_edge(call_site.clone(), inv.kind, callee.clone());
                    if edge_is_new && cg.mark_reachable(callee.clone()) {
                        worklist.push_back(callee);
                    }
                }
            }
        }
        cg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CfgEdge, Expr, MethodBuilder, ProgramBuilder, StmtKind, Subsignature, Type};

    /// S3: `A <: Object`, `B <: A`, both declare `m()`; a call `a.m()`
    /// through a variable of static type `A` must reach both `A.m` and
    /// `B.m` in the call graph.
    #[test]
    fn s3_virtual_dispatch_reaches_all_overrides() {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("A", false, Some(ClassId::from("Object")), vec![]);
        pb.class("B", false, Some(ClassId::from("A")), vec![]);
        pb.class("Main", false, None, vec![]);

        let sig = Subsignature::new("m()");
        for class in ["A", "B"] {
            let mut mb = MethodBuilder::new(sig.clone(), false).this(Type::Class(ClassId::from(class)));
            mb.stmt(StmtId(0), StmtKind::Return(None));
            pb.method(&ClassId::from(class), mb);
        }

        let mut main = MethodBuilder::new(Subsignature::new("main()"), true);
        let a = main.var("a", Type::Class(ClassId::from("A")));
        main.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: a,
                expr: Expr::New(ClassId::from("A")),
            },
        );
        main.stmt(
            StmtId(1),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Virtual,
                method: MethodRef {
                    class: ClassId::from("A"),
                    subsignature: sig.clone(),
                },
                receiver: Some(a),
                args: vec![],
                dst: None,
            }),
        );
        main.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        pb.method(&ClassId::from("Main"), main);

        let program = pb.build();
        let hierarchy = ClassHierarchy::new(&program);
        let builder = ChaBuilder::new(hierarchy);
        let main_id = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("main()"),
        };
        let cg = builder.build(main_id.clone());

        let call_site = CallSite {
            caller: main_id,
            stmt: StmtId(1),
        };
        let callees: BTreeSet<_> = cg.edges_at(&call_site).map(|(_, m)| m.declaring_class.clone()).collect();
        assert_eq!(
            callees,
            BTreeSet::from([ClassId::from("A"), ClassId::from("B")])
        );
    }
}

//! The inter-procedural control-flow graph (`§3`): `Normal`, `Call`,
//! `CallToReturn`, and `Return` edges over `(context-tagged method,
//! statement)` nodes, built from a context-sensitive call graph so
//! [`crate::interprop`] can run one fixpoint across the whole program
//! instead of per-method solves glued together by hand.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    cha::{CallGraph, CallSite},
    ir::{Program, StmtId, StmtKind},
    pta::context::CsMethod,
};

/// A node in the ICFG: a statement, scoped to the context-tagged method
/// it is being analyzed in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IcfgNode {
    pub method: CsMethod,
    pub stmt: StmtId,
}

/// An inter-procedural edge kind (`§3`). `Call`/`CallToReturn` carry the
/// call site they originate from (their source node, restated for
/// uniformity); `Return` carries it too, since its source is the
/// callee's exit and its target is the call site's normal successor --
/// neither endpoint names the call site on its own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IcfgEdge {
    Normal,
    Call { call_site: IcfgNode },
    CallToReturn { call_site: IcfgNode },
    Return { call_site: IcfgNode },
}

/// The inter-procedural control-flow graph over every method reachable
/// in a context-sensitive call graph.
#[derive(Debug, Default)]
pub struct Icfg {
    forward: BTreeMap<IcfgNode, BTreeSet<(IcfgEdge, IcfgNode)>>,
    backward: BTreeMap<IcfgNode, BTreeSet<(IcfgEdge, IcfgNode)>>,
    nodes: BTreeSet<IcfgNode>,
}

impl Icfg {
    fn add_edge(&mut self, src: IcfgNode, edge: IcfgEdge, dst: IcfgNode) {
        self.nodes.insert(src.clone());
        self.nodes.insert(dst.clone());
        self.forward
            .entry(src.clone())
            .or_default()
            .insert((edge.clone(), dst.clone()));
        self.backward.entry(dst).or_default().insert((edge, src));
    }

    pub fn edges_from(&self, node: &IcfgNode) -> impl Iterator<Item = &(IcfgEdge, IcfgNode)> {
        self.forward.get(node).into_iter().flatten()
    }

    pub fn edges_into(&self, node: &IcfgNode) -> impl Iterator<Item = &(IcfgEdge, IcfgNode)> {
        self.backward.get(node).into_iter().flatten()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &IcfgNode> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn contains(&self, node: &IcfgNode) -> bool {
        self.nodes.contains(node)
    }
}

/// Builds the ICFG from `call_graph`'s reachable methods: every
/// intraprocedural edge becomes `Normal`, except that a call site's
/// outgoing edges become `CallToReturn` instead (the call's own
/// successor is reached either by skipping the call entirely, or by
/// the callee returning into it) and are supplemented with a `Call`
/// edge into each resolved callee's entry and a `Return` edge from
/// each of the callee's exits back to that same successor.
#[must_use]
pub fn build_icfg(program: &Program, call_graph: &CallGraph<CsMethod>) -> Icfg {
    let mut icfg = Icfg::default();
    for method in call_graph.reachable_methods() {
        let Some(m) = program.method(&method.method) else {
            continue;
        };
        let Some(cfg) = m.cfg() else { continue };
        for (stmt_id, stmt) in cfg.nodes() {
            let node = IcfgNode {
                method: method.clone(),
                stmt: stmt_id,
            };
            icfg.nodes.insert(node.clone());
            if !matches!(stmt, StmtKind::Invoke(_)) {
                for (dst, _edge) in cfg.edges_from(stmt_id) {
                    icfg.add_edge(
                        node.clone(),
                        IcfgEdge::Normal,
                        IcfgNode {
                            method: method.clone(),
                            stmt: dst,
                        },
                    );
                }
                continue;
            }

            let successors: Vec<StmtId> = cfg.edges_from(stmt_id).map(|(dst, _)| dst).collect();
            for &dst in &successors {
                icfg.add_edge(
                    node.clone(),
                    IcfgEdge::CallToReturn {
                        call_site: node.clone(),
                    },
                    IcfgNode {
                        method: method.clone(),
                        stmt: dst,
                    },
                );
            }

            let call_site = CallSite {
                caller: method.clone(),
                stmt: stmt_id,
            };
            for (_kind, callee) in call_graph.edges_at(&call_site) {
                let Some(callee_method) = program.method(&callee.method) else {
                    continue;
                };
                let Some(callee_cfg) = callee_method.cfg() else {
                    continue;
                };
                icfg.add_edge(
                    node.clone(),
                    IcfgEdge::Call {
                        call_site: node.clone(),
                    },
                    IcfgNode {
                        method: callee.clone(),
                        stmt: callee_cfg.entry_point(),
                    },
                );
                for exit in callee_cfg.exits() {
                    let exit_node = IcfgNode {
                        method: callee.clone(),
                        stmt: exit,
                    };
                    for &dst in &successors {
                        icfg.add_edge(
                            exit_node.clone(),
                            IcfgEdge::Return {
                                call_site: node.clone(),
                            },
                            IcfgNode {
                                method: method.clone(),
                                stmt: dst,
                            },
                        );
                    }
                }
            }
        }
    }
    icfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{CallKind, CfgEdge, ClassId, Expr, Invoke, MethodBuilder, MethodId, MethodRef, ProgramBuilder, RValue, Subsignature, Type},
        pta::context::{Context, KCallSiteSensitivity},
        pta::heap::AllocSiteHeapModel,
        pta::CsPta,
    };

    fn build_caller_callee_program() -> (crate::ir::Program, MethodId, MethodId) {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("Main", false, None, vec![]);

        let mut callee = MethodBuilder::new(Subsignature::new("callee()"), true);
        let ret = callee.var("r", Type::Primitive(crate::ir::types::PrimitiveType::Int));
        callee.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: ret,
                expr: Expr::Value(RValue::IntLiteral(1)),
            },
        );
        callee.stmt(StmtId(1), StmtKind::Return(Some(ret)));
        callee.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        pb.method(&ClassId::from("Main"), callee);

        let mut main = MethodBuilder::new(Subsignature::new("main()"), true);
        let x = main.var("x", Type::Primitive(crate::ir::types::PrimitiveType::Int));
        main.stmt(
            StmtId(0),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Static,
                method: MethodRef {
                    class: ClassId::from("Main"),
                    subsignature: Subsignature::new("callee()"),
                },
                receiver: None,
                args: vec![],
                dst: Some(x),
            }),
        );
        main.stmt(StmtId(1), StmtKind::Return(None));
        main.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        pb.method(&ClassId::from("Main"), main);

        let program = pb.build();
        let main_id = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("main()"),
        };
        let callee_id = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("callee()"),
        };
        (program, main_id, callee_id)
    }

    #[test]
    fn call_site_gets_call_call_to_return_and_matching_return_edges() {
        let (program, main_id, callee_id) = build_caller_callee_program();
        let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(1));
        let result = pta.solve(main_id.clone());
        let icfg = build_icfg(&program, result.call_graph());

        let empty = Context::empty();
        let call_node = IcfgNode {
            method: CsMethod {
                ctx: empty.clone(),
                method: main_id.clone(),
            },
            stmt: StmtId(0),
        };
        let successor_node = IcfgNode {
            method: CsMethod {
                ctx: empty.clone(),
                method: main_id,
            },
            stmt: StmtId(1),
        };

        let kinds: Vec<&IcfgEdge> = icfg.edges_from(&call_node).map(|(e, _)| e).collect();
        assert!(kinds.iter().any(|e| matches!(e, IcfgEdge::Call { .. })));
        assert!(kinds.iter().any(|e| matches!(e, IcfgEdge::CallToReturn { .. })));

        let incoming: Vec<&IcfgEdge> = icfg.edges_into(&successor_node).map(|(e, _)| e).collect();
        assert!(incoming.iter().any(|e| matches!(e, IcfgEdge::CallToReturn { .. })));
        assert!(incoming.iter().any(|e| matches!(e, IcfgEdge::Return { .. })));

        let _ = callee_id;
    }
}

//! `§4.D` -- context-insensitive pointer analysis: an inclusion-based
//! worklist fixpoint over the Pointer-Flow Graph, with on-the-fly
//! call-graph construction driven by the receiver's points-to set.

use std::collections::{BTreeMap, VecDeque};

use crate::{
    cha::{self, CallGraph, CallSite},
    errors::AnalysisError,
    hierarchy::{ClassHierarchy, subsignature_of},
    ir::{
        CallKind, Expr, FieldBase, FieldRef, MethodId, MethodRef, Program, RValue, StmtId, StmtKind,
        VarId,
    },
    pta::heap::{AllocSite, HeapModel, Obj},
    pta::pointer::{MethodVar, Pointer, PointerFlowGraph, PointsToSet},
};

type Ptr = Pointer<MethodVar, Obj>;

/// The frozen result of a context-insensitive solve: every pointer's
/// points-to set, the precise on-the-fly call graph, and the set of
/// reachable methods (`§6`).
#[derive(Debug)]
pub struct CiPtaResult {
    pts: BTreeMap<Ptr, PointsToSet<Obj>>,
    pfg: PointerFlowGraph<MethodVar, Obj>,
    call_graph: CallGraph<MethodId>,
}

impl CiPtaResult {
    #[must_use]
    pub fn points_to_var(&self, method: &MethodId, var: VarId) -> PointsToSet<Obj> {
        self.pts
            .get(&Pointer::Var(MethodVar {
                method: method.clone(),
                var,
            }))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn points_to_instance_field(&self, obj: &Obj, field: &FieldRef) -> PointsToSet<Obj> {
        self.pts
            .get(&Pointer::InstanceField(obj.clone(), field.clone()))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn points_to_static_field(&self, field: &FieldRef) -> PointsToSet<Obj> {
        self.pts
            .get(&Pointer::StaticField(field.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = &MethodId> {
        self.call_graph.reachable_methods()
    }

    #[must_use]
    pub fn call_graph(&self) -> &CallGraph<MethodId> {
        &self.call_graph
    }

    /// `§8` invariant 3: no PFG edge `src -> tgt` has `pt(src) ⊄ pt(tgt)`.
    #[must_use]
    pub fn check_pfg_inclusion(&self) -> bool {
        self.pfg.edges().all(|(src, tgt)| {
            let Some(src_pts) = self.pts.get(src) else {
                return true;
            };
            let tgt_pts = self.pts.get(tgt);
            src_pts
                .iter()
                .all(|o| tgt_pts.is_some_and(|t| t.contains(o)))
        })
    }

    /// `§7`: the `Result::Err` form of the fatal "analysis invariant
    /// violation" abort. A caller that wants to assert `§8` invariant 3
    /// before trusting a solve's output calls this instead of panicking
    /// on a failed [`Self::check_pfg_inclusion`].
    ///
    /// # Errors
    /// Returns [`AnalysisError::InvariantViolation`] if the PFG's
    /// inclusion invariant does not hold.
    pub fn verify_invariants(&self) -> Result<(), AnalysisError> {
        self.check_pfg_inclusion()
            .then_some(())
            .ok_or(AnalysisError::InvariantViolation)
    }
}

/// The context-insensitive solver: owns all mutable per-analysis state
/// until `solve()` freezes it into a [`CiPtaResult`] (`§5`).
pub struct CiPta<'p, H> {
    program: &'p Program,
    hierarchy: ClassHierarchy<'p>,
    heap_model: H,
    pts: BTreeMap<Ptr, PointsToSet<Obj>>,
    pfg: PointerFlowGraph<MethodVar, Obj>,
    call_graph: CallGraph<MethodId>,
    worklist: VecDeque<(Ptr, PointsToSet<Obj>)>,
}

impl<'p, H: HeapModel> CiPta<'p, H> {
    #[must_use]
    pub fn new(program: &'p Program, heap_model: H) -> Self {
        Self {
            program,
            hierarchy: ClassHierarchy::new(program),
            heap_model,
            pts: BTreeMap::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            worklist: VecDeque::new(),
        }
    }

    /// Runs the worklist fixpoint from `entry` to completion.
    #[must_use]
    pub fn solve(mut self, entry: MethodId) -> CiPtaResult {
        self.call_graph.add_entry(entry.clone());
        self.add_reachable(&entry);
        while let Some((pointer, delta_in)) = self.worklist.pop_front() {
            let delta = self.propagate(&pointer, &delta_in);
            if delta.is_empty() {
                continue;
            }
            if let Pointer::Var(mv) = pointer.clone() {
                let objs: Vec<Obj> = delta.iter().cloned().collect();
                for obj in &objs {
                    self.handle_field_and_array_sites(&mv, obj);
                    self.process_call(&mv, obj);
                }
            }
            let successors: Vec<Ptr> = self.pfg.successors(&pointer).cloned().collect();
            for succ in successors {
                self.worklist.push_back((succ, delta.clone()));
            }
        }
        CiPtaResult {
            pts: self.pts,
            pfg: self.pfg,
            call_graph: self.call_graph,
        }
    }

    fn pts_of(&self, p: &Ptr) -> PointsToSet<Obj> {
        self.pts.get(p).cloned().unwrap_or_default()
    }

    /// `propagate(n, pts)`: merges `delta_in` into `n`'s points-to set,
    /// returning the objects that were actually new.
    fn propagate(&mut self, pointer: &Ptr, delta_in: &PointsToSet<Obj>) -> PointsToSet<Obj> {
        let entry = self.pts.entry(pointer.clone()).or_default();
        entry.union_from(delta_in).into_iter().collect()
    }

    fn add_pfg_edge(&mut self, src: Ptr, tgt: Ptr) {
        if self.pfg.add_edge(src.clone(), tgt.clone()) {
            let pts = self.pts_of(&src);
            if !pts.is_empty() {
                self.worklist.push_back((tgt, pts));
            }
        }
    }

    /// `addReachable(m)` (`§3` invariant 4: processed at most once).
    fn add_reachable(&mut self, m: &MethodId) {
        if !self.call_graph.mark_reachable(m.clone()) {
            return;
        }
        let Some(method) = self.program.method(m) else {
            return;
        };
        let Some(cfg) = method.cfg() else { return };
        for (stmt_id, stmt) in cfg.nodes() {
            match stmt {
                StmtKind::Assign {
                    dst,
                    expr: Expr::New(class),
                } => {
                    let site = AllocSite {
                        method: m.clone(),
                        stmt: stmt_id,
                    };
                    let obj = self.heap_model.obj(site, class.clone());
                    let ptr = Pointer::Var(MethodVar {
                        method: m.clone(),
                        var: *dst,
                    });
                    self.worklist.push_back((ptr, PointsToSet::singleton(obj)));
                }
                StmtKind::Assign {
                    dst,
                    expr: Expr::Value(RValue::Var(src)),
                } => {
                    self.add_pfg_edge(
                        Pointer::Var(MethodVar {
                            method: m.clone(),
                            var: *src,
                        }),
                        Pointer::Var(MethodVar {
                            method: m.clone(),
                            var: *dst,
                        }),
                    );
                }
                StmtKind::Assign {
                    dst,
                    expr:
                        Expr::LoadField {
                            base: FieldBase::Static,
                            field,
                        },
                } => {
                    self.add_pfg_edge(
                        Pointer::StaticField(field.clone()),
                        Pointer::Var(MethodVar {
                            method: m.clone(),
                            var: *dst,
                        }),
                    );
                }
                StmtKind::StoreField {
                    base: FieldBase::Static,
                    field,
                    src,
                } => {
                    self.add_pfg_edge(
                        Pointer::Var(MethodVar {
                            method: m.clone(),
                            var: *src,
                        }),
                        Pointer::StaticField(field.clone()),
                    );
                }
                StmtKind::Invoke(inv) if inv.kind == CallKind::Static => {
                    if let Some(callee) = cha::resolve_static_or_special(&self.hierarchy, &inv.method) {
                        self.link_call(m, stmt_id, CallKind::Static, &callee, &inv.args, inv.dst);
                    }
                }
                _ => {}
            }
        }
    }

    /// Wires instance-field and array load/store PFG edges reactively,
    /// once `mv` is known to point to `obj` (`§4.D`).
    fn handle_field_and_array_sites(&mut self, mv: &MethodVar, obj: &Obj) {
        let Some(method) = self.program.method(&mv.method) else {
            return;
        };
        let stores: Vec<StmtKind> = method.store_fields_on(mv.var).map(|(_, s)| s.clone()).collect();
        for stmt in stores {
            if let StmtKind::StoreField { field, src, .. } = stmt {
                self.add_pfg_edge(
                    Pointer::Var(MethodVar {
                        method: mv.method.clone(),
                        var: src,
                    }),
                    Pointer::InstanceField(obj.clone(), field),
                );
            }
        }
        let loads: Vec<StmtKind> = method.load_fields_on(mv.var).map(|(_, s)| s.clone()).collect();
        for stmt in loads {
            if let StmtKind::Assign {
                dst,
                expr: Expr::LoadField { field, .. },
            } = stmt
            {
                self.add_pfg_edge(
                    Pointer::InstanceField(obj.clone(), field),
                    Pointer::Var(MethodVar {
                        method: mv.method.clone(),
                        var: dst,
                    }),
                );
            }
        }
        let array_stores: Vec<StmtKind> = method.store_arrays_on(mv.var).map(|(_, s)| s.clone()).collect();
        for stmt in array_stores {
            if let StmtKind::StoreArray { src, .. } = stmt {
                self.add_pfg_edge(
                    Pointer::Var(MethodVar {
                        method: mv.method.clone(),
                        var: src,
                    }),
                    Pointer::ArrayIndex(obj.clone()),
                );
            }
        }
        let array_loads: Vec<StmtKind> = method.load_arrays_on(mv.var).map(|(_, s)| s.clone()).collect();
        for stmt in array_loads {
            if let StmtKind::Assign {
                dst,
                expr: Expr::LoadArray { .. },
            } = stmt
            {
                self.add_pfg_edge(
                    Pointer::ArrayIndex(obj.clone()),
                    Pointer::Var(MethodVar {
                        method: mv.method.clone(),
                        var: dst,
                    }),
                );
            }
        }
    }

    /// `processCall(x, obj)`: virtual/interface/special invokes on `x`
    /// dispatch against `obj`'s declared type (`§3` invariant 5).
    fn process_call(&mut self, mv: &MethodVar, obj: &Obj) {
        let Some(method) = self.program.method(&mv.method) else {
            return;
        };
        let invokes: Vec<(StmtId, CallKind, MethodRef, Vec<VarId>, Option<VarId>)> = method
            .invokes_on_receiver(mv.var)
            .filter(|(_, inv)| inv.kind != CallKind::Static)
            .map(|(id, inv)| (id, inv.kind, inv.method.clone(), inv.args.clone(), inv.dst))
            .collect();
        for (stmt_id, kind, method_ref, args, dst) in invokes {
            // SPECIAL dispatch resolves against the statically named class
            // in the method reference (`§4.B`); only VIRTUAL/INTERFACE
            // dispatch against the receiver object's declared type (`§3`
            // invariant 5).
            let target = match kind {
                CallKind::Special => cha::resolve_static_or_special(&self.hierarchy, &method_ref),
                _ => cha::dispatch(&self.hierarchy, &obj.ty, subsignature_of(&method_ref)),
            };
            let Some(callee) = target else {
                continue;
            };
            let Some(callee_method) = self.program.method(&callee) else {
                continue;
            };
            if let Some(this_var) = callee_method.this_var {
                let this_ptr = Pointer::Var(MethodVar {
                    method: callee.clone(),
                    var: this_var,
                });
                self.worklist.push_back((this_ptr, PointsToSet::singleton(obj.clone())));
            }
            self.link_call(&mv.method, stmt_id, kind, &callee, &args, dst);
        }
    }

    /// Adds a call-graph edge if new, recurses `addReachable`, and wires
    /// argument/return PFG edges.
    fn link_call(
        &mut self,
        caller: &MethodId,
        stmt_id: StmtId,
        kind: CallKind,
        callee: &MethodId,
        args: &[VarId],
        dst: Option<VarId>,
    ) {
        let call_site = CallSite {
            caller: caller.clone(),
            stmt: stmt_id,
        };
        if !self.call_graph.add_edge(call_site, kind, callee.clone()) {
            return;
        }
        self.add_reachable(callee);
        let Some(callee_method) = self.program.method(callee) else {
            return;
        };
        for (a, p) in args.iter().zip(callee_method.params.iter()) {
            self.add_pfg_edge(
                Pointer::Var(MethodVar {
                    method: caller.clone(),
                    var: *a,
                }),
                Pointer::Var(MethodVar {
                    method: callee.clone(),
                    var: *p,
                }),
            );
        }
        if let Some(dst) = dst {
            for ret in callee_method.return_vars() {
                self.add_pfg_edge(
                    Pointer::Var(MethodVar {
                        method: callee.clone(),
                        var: ret,
                    }),
                    Pointer::Var(MethodVar {
                        method: caller.clone(),
                        var: dst,
                    }),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{CfgEdge, ClassId, MethodBuilder, ProgramBuilder, Subsignature, Type},
        pta::heap::AllocSiteHeapModel,
    };

    /// S4: `A a = new A(); A b = a; a.f = new C(); D d = b.f;` then
    /// `pt(a) = pt(b) = {o_A}`, `pt(a.f at o_A) ⊇ {o_C}`, `pt(d) ⊇ {o_C}`.
    #[test]
    fn s4_aliasing_through_field() {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("A", false, Some(ClassId::from("Object")), vec![]);
        pb.class("C", false, Some(ClassId::from("Object")), vec![]);
        pb.class("D", false, Some(ClassId::from("Object")), vec![]);
        pb.class("Main", false, None, vec![]);

        let field = FieldRef {
            declaring_class: ClassId::from("A"),
            name: "f".into(),
            ty: Type::Class(ClassId::from("C")),
        };
        pb.field(&ClassId::from("A"), field.clone());

        let mut mb = MethodBuilder::new(Subsignature::new("main()"), true);
        let a = mb.var("a", Type::Class(ClassId::from("A")));
        let b = mb.var("b", Type::Class(ClassId::from("A")));
        let tmp_c = mb.var("tmpC", Type::Class(ClassId::from("C")));
        let d = mb.var("d", Type::Class(ClassId::from("D")));
        mb.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: a,
                expr: Expr::New(ClassId::from("A")),
            },
        );
        mb.stmt(
            StmtId(1),
            StmtKind::Assign {
                dst: b,
                expr: Expr::Value(RValue::Var(a)),
            },
        );
        mb.stmt(
            StmtId(2),
            StmtKind::Assign {
                dst: tmp_c,
                expr: Expr::New(ClassId::from("C")),
            },
        );
        mb.stmt(
            StmtId(3),
            StmtKind::StoreField {
                base: FieldBase::Instance(a),
                field: field.clone(),
                src: tmp_c,
            },
        );
        mb.stmt(
            StmtId(4),
            StmtKind::Assign {
                dst: d,
                expr: Expr::LoadField {
                    base: FieldBase::Instance(b),
                    field: field.clone(),
                },
            },
        );
        mb.stmt(StmtId(5), StmtKind::Return(None));
        for i in 0..5 {
            mb.edge(StmtId(i), StmtId(i + 1), CfgEdge::Normal);
        }
        pb.method(&ClassId::from("Main"), mb);

        let program = pb.build();
        let entry = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("main()"),
        };
        let pta = CiPta::new(&program, AllocSiteHeapModel);
        let result = pta.solve(entry.clone());

        let pt_a = result.points_to_var(&entry, a);
        let pt_b = result.points_to_var(&entry, b);
        assert_eq!(pt_a, pt_b);
        assert_eq!(pt_a.len(), 1);
        let obj_a = pt_a.iter().next().unwrap().clone();

        let pt_field = result.points_to_instance_field(&obj_a, &field);
        assert_eq!(pt_field.len(), 1);

        let pt_d = result.points_to_var(&entry, d);
        assert_eq!(pt_d, pt_field);
        assert!(result.check_pfg_inclusion());
    }
}

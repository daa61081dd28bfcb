//! `§4.E` -- context-sensitive pointer analysis: the same inclusion-based
//! worklist as [`crate::pta::ci`], but every variable/object/method is
//! tagged with a [`Context`] selected by a [`ContextSelector`], so the
//! same source variable analyzed under two different calling contexts
//! gets two independent points-to sets.

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
};

use crate::{
    cha::{self, CallGraph, CallSite},
    hierarchy::{ClassHierarchy, subsignature_of},
    ir::{
        CallKind, Expr, FieldBase, FieldRef, MethodId, MethodRef, Program, RValue, StmtId, StmtKind,
        VarId,
    },
    pta::context::{Context, ContextSelector, CsMethod, CsObj},
    pta::heap::{AllocSite, HeapModel, Obj},
    pta::pointer::{MethodVar, Pointer, PointerFlowGraph, PointsToSet},
};

/// A variable tagged with the context under which it is being analyzed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsVar {
    pub ctx: Context,
    pub var: MethodVar,
}

impl fmt::Display for CsVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.ctx, self.var)
    }
}

/// Shorthand for a context-sensitive pointer: `Pointer<CsVar, CsObj>`.
pub type Ptr = Pointer<CsVar, CsObj>;

/// The frozen result of a context-sensitive solve.
#[derive(Debug)]
pub struct CsPtaResult {
    pts: BTreeMap<Ptr, PointsToSet<CsObj>>,
    pfg: PointerFlowGraph<CsVar, CsObj>,
    call_graph: CallGraph<CsMethod>,
}

impl CsPtaResult {
    #[must_use]
    pub fn points_to_var(&self, ctx: &Context, method: &MethodId, var: VarId) -> PointsToSet<CsObj> {
        self.pts
            .get(&Pointer::Var(CsVar {
                ctx: ctx.clone(),
                var: MethodVar {
                    method: method.clone(),
                    var,
                },
            }))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn points_to_instance_field(&self, obj: &CsObj, field: &FieldRef) -> PointsToSet<CsObj> {
        self.pts
            .get(&Pointer::InstanceField(obj.clone(), field.clone()))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn points_to_static_field(&self, field: &FieldRef) -> PointsToSet<CsObj> {
        self.pts
            .get(&Pointer::StaticField(field.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = &CsMethod> {
        self.call_graph.reachable_methods()
    }

    #[must_use]
    pub fn call_graph(&self) -> &CallGraph<CsMethod> {
        &self.call_graph
    }

    /// The points-to set of any pointer this solve computed, generic over
    /// `Var`/`InstanceField`/`StaticField`/`ArrayIndex`. Used by
    /// [`crate::interprop`] and [`crate::taint`], which both need to walk
    /// pointers the typed accessors above don't name individually.
    #[must_use]
    pub fn points_to(&self, pointer: &Ptr) -> PointsToSet<CsObj> {
        self.pts.get(pointer).cloned().unwrap_or_default()
    }

    /// Every `VarPtr` this solve produced a (possibly empty) points-to set
    /// for, paired with that set. The alias map `§4.F` precomputes from
    /// the PTA result is built by inverting this.
    pub fn var_pointers(&self) -> impl Iterator<Item = (&CsVar, &PointsToSet<CsObj>)> {
        self.pts.iter().filter_map(|(p, pts)| match p {
            Pointer::Var(v) => Some((v, pts)),
            _ => None,
        })
    }

    /// The PFG successors of `pointer` (`§3`), reused by [`crate::taint`]
    /// to propagate taint markers through the already-solved graph
    /// without rebuilding it.
    pub fn pfg_successors(&self, pointer: &Ptr) -> impl Iterator<Item = &Ptr> {
        self.pfg.successors(pointer)
    }

    /// `§8` invariant 3 (PFG inclusion), checked over the context-tagged
    /// pointers this solve produced.
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
    /// violation" abort, mirroring [`super::ci::CiPtaResult::verify_invariants`].
    ///
    /// # Errors
    /// Returns [`crate::errors::AnalysisError::InvariantViolation`] if the
    /// PFG's inclusion invariant does not hold.
    pub fn verify_invariants(&self) -> Result<(), crate::errors::AnalysisError> {
        self.check_pfg_inclusion()
            .then_some(())
            .ok_or(crate::errors::AnalysisError::InvariantViolation)
    }
}

/// The context-sensitive solver, parameterized over the heap model and
/// the [`ContextSelector`] strategy (`§6`).
pub struct CsPta<'p, H, S> {
    program: &'p Program,
    hierarchy: ClassHierarchy<'p>,
    heap_model: H,
    selector: S,
    pts: BTreeMap<Ptr, PointsToSet<CsObj>>,
    pfg: PointerFlowGraph<CsVar, CsObj>,
    call_graph: CallGraph<CsMethod>,
    worklist: VecDeque<(Ptr, PointsToSet<CsObj>)>,
}

impl<'p, H: HeapModel, S: ContextSelector> CsPta<'p, H, S> {
    #[must_use]
    pub fn new(program: &'p Program, heap_model: H, selector: S) -> Self {
        Self {
            program,
            hierarchy: ClassHierarchy::new(program),
            heap_model,
            selector,
            pts: BTreeMap::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            worklist: VecDeque::new(),
        }
    }

    /// Runs the worklist fixpoint from `entry`, analyzed under the empty
    /// context, to completion.
    #[must_use]
    pub fn solve(mut self, entry: MethodId) -> CsPtaResult {
        let entry_cs = CsMethod {
            ctx: self.selector.empty_context(),
            method: entry,
        };
        self.call_graph.add_entry(entry_cs.clone());
        self.add_reachable(&entry_cs);
        while let Some((pointer, delta_in)) = self.worklist.pop_front() {
            let delta = self.propagate(&pointer, &delta_in);
            if delta.is_empty() {
                continue;
            }
            if let Pointer::Var(cv) = pointer.clone() {
                let objs: Vec<CsObj> = delta.iter().cloned().collect();
                for obj in &objs {
                    self.handle_field_and_array_sites(&cv, obj);
                    self.process_call(&cv, obj);
                }
            }
            let successors: Vec<Ptr> = self.pfg.successors(&pointer).cloned().collect();
            for succ in successors {
                self.worklist.push_back((succ, delta.clone()));
            }
        }
        CsPtaResult {
            pts: self.pts,
            pfg: self.pfg,
            call_graph: self.call_graph,
        }
    }

    fn pts_of(&self, p: &Ptr) -> PointsToSet<CsObj> {
        self.pts.get(p).cloned().unwrap_or_default()
    }

    fn propagate(&mut self, pointer: &Ptr, delta_in: &PointsToSet<CsObj>) -> PointsToSet<CsObj> {
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

    fn add_reachable(&mut self, m: &CsMethod) {
        if !self.call_graph.mark_reachable(m.clone()) {
            return;
        }
        let Some(method) = self.program.method(&m.method) else {
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
                        method: m.method.clone(),
                        stmt: stmt_id,
                    };
                    let obj = self.heap_model.obj(site, class.clone());
                    let heap_ctx = self.selector.select_heap_context(m, &obj);
                    let cs_obj = CsObj { ctx: heap_ctx, obj };
                    let ptr = Pointer::Var(CsVar {
                        ctx: m.ctx.clone(),
                        var: MethodVar {
                            method: m.method.clone(),
                            var: *dst,
                        },
                    });
                    self.worklist.push_back((ptr, PointsToSet::singleton(cs_obj)));
                }
                StmtKind::Assign {
                    dst,
                    expr: Expr::Value(RValue::Var(src)),
                } => {
                    self.add_pfg_edge(
                        Pointer::Var(CsVar {
                            ctx: m.ctx.clone(),
                            var: MethodVar {
                                method: m.method.clone(),
                                var: *src,
                            },
                        }),
                        Pointer::Var(CsVar {
                            ctx: m.ctx.clone(),
                            var: MethodVar {
                                method: m.method.clone(),
                                var: *dst,
                            },
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
                        Pointer::Var(CsVar {
                            ctx: m.ctx.clone(),
                            var: MethodVar {
                                method: m.method.clone(),
                                var: *dst,
                            },
                        }),
                    );
                }
                StmtKind::StoreField {
                    base: FieldBase::Static,
                    field,
                    src,
                } => {
                    self.add_pfg_edge(
                        Pointer::Var(CsVar {
                            ctx: m.ctx.clone(),
                            var: MethodVar {
                                method: m.method.clone(),
                                var: *src,
                            },
                        }),
                        Pointer::StaticField(field.clone()),
                    );
                }
                StmtKind::Invoke(inv) if inv.kind == CallKind::Static => {
                    if let Some(callee) = cha::resolve_static_or_special(&self.hierarchy, &inv.method) {
                        let call_site = CallSite {
                            caller: m.method.clone(),
                            stmt: stmt_id,
                        };
                        let callee_ctx = self.selector.select_context(&m.ctx, &call_site, &callee);
                        let callee_cs = CsMethod {
                            ctx: callee_ctx,
                            method: callee,
                        };
                        self.link_call(m, stmt_id, CallKind::Static, &callee_cs, &inv.args, inv.dst);
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_field_and_array_sites(&mut self, cv: &CsVar, obj: &CsObj) {
        let Some(method) = self.program.method(&cv.var.method) else {
            return;
        };
        let stores: Vec<StmtKind> = method
            .store_fields_on(cv.var.var)
            .map(|(_, s)| s.clone())
            .collect();
        for stmt in stores {
            if let StmtKind::StoreField { field, src, .. } = stmt {
                self.add_pfg_edge(
                    Pointer::Var(CsVar {
                        ctx: cv.ctx.clone(),
                        var: MethodVar {
                            method: cv.var.method.clone(),
                            var: src,
                        },
                    }),
                    Pointer::InstanceField(obj.clone(), field),
                );
            }
        }
        let loads: Vec<StmtKind> = method
            .load_fields_on(cv.var.var)
            .map(|(_, s)| s.clone())
            .collect();
        for stmt in loads {
            if let StmtKind::Assign {
                dst,
                expr: Expr::LoadField { field, .. },
            } = stmt
            {
                self.add_pfg_edge(
                    Pointer::InstanceField(obj.clone(), field),
                    Pointer::Var(CsVar {
                        ctx: cv.ctx.clone(),
                        var: MethodVar {
                            method: cv.var.method.clone(),
                            var: dst,
                        },
                    }),
                );
            }
        }
        let array_stores: Vec<StmtKind> = method
            .store_arrays_on(cv.var.var)
            .map(|(_, s)| s.clone())
            .collect();
        for stmt in array_stores {
            if let StmtKind::StoreArray { src, .. } = stmt {
                self.add_pfg_edge(
                    Pointer::Var(CsVar {
                        ctx: cv.ctx.clone(),
                        var: MethodVar {
                            method: cv.var.method.clone(),
                            var: src,
                        },
                    }),
                    Pointer::ArrayIndex(obj.clone()),
                );
            }
        }
        let array_loads: Vec<StmtKind> = method
            .load_arrays_on(cv.var.var)
            .map(|(_, s)| s.clone())
            .collect();
        for stmt in array_loads {
            if let StmtKind::Assign {
                dst,
                expr: Expr::LoadArray { .. },
            } = stmt
            {
                self.add_pfg_edge(
                    Pointer::ArrayIndex(obj.clone()),
                    Pointer::Var(CsVar {
                        ctx: cv.ctx.clone(),
                        var: MethodVar {
                            method: cv.var.method.clone(),
                            var: dst,
                        },
                    }),
                );
            }
        }
    }

    fn process_call(&mut self, cv: &CsVar, obj: &CsObj) {
        let Some(method) = self.program.method(&cv.var.method) else {
            return;
        };
        let invokes: Vec<(StmtId, CallKind, MethodRef, Vec<VarId>, Option<VarId>)> = method
            .invokes_on_receiver(cv.var.var)
            .filter(|(_, inv)| inv.kind != CallKind::Static)
            .map(|(id, inv)| (id, inv.kind, inv.method.clone(), inv.args.clone(), inv.dst))
            .collect();
        let caller_cs = CsMethod {
            ctx: cv.ctx.clone(),
            method: cv.var.method.clone(),
        };
        for (stmt_id, kind, method_ref, args, dst) in invokes {
            // SPECIAL dispatch resolves against the statically named class
            // in the method reference; only VIRTUAL/INTERFACE dispatch
            // against the receiver object's declared type (`§3` invariant 5).
            let target = match kind {
                CallKind::Special => cha::resolve_static_or_special(&self.hierarchy, &method_ref),
                _ => cha::dispatch(&self.hierarchy, &obj.obj.ty, subsignature_of(&method_ref)),
            };
            let Some(callee) = target else {
                continue;
            };
            let call_site = CallSite {
                caller: cv.var.method.clone(),
                stmt: stmt_id,
            };
            let callee_ctx = self
                .selector
                .select_context_with_recv(&cv.ctx, &call_site, obj, &callee);
            let callee_cs = CsMethod {
                ctx: callee_ctx,
                method: callee,
            };
            let Some(callee_method) = self.program.method(&callee_cs.method) else {
                continue;
            };
            if let Some(this_var) = callee_method.this_var {
                let this_ptr = Pointer::Var(CsVar {
                    ctx: callee_cs.ctx.clone(),
                    var: MethodVar {
                        method: callee_cs.method.clone(),
                        var: this_var,
                    },
                });
                self.worklist.push_back((this_ptr, PointsToSet::singleton(obj.clone())));
            }
            self.link_call(&caller_cs, stmt_id, kind, &callee_cs, &args, dst);
        }
    }

    fn link_call(
        &mut self,
        caller: &CsMethod,
        stmt_id: StmtId,
        kind: CallKind,
        callee: &CsMethod,
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
        let Some(callee_method) = self.program.method(&callee.method) else {
            return;
        };
        for (a, p) in args.iter().zip(callee_method.params.iter()) {
            self.add_pfg_edge(
                Pointer::Var(CsVar {
                    ctx: caller.ctx.clone(),
                    var: MethodVar {
                        method: caller.method.clone(),
                        var: *a,
                    },
                }),
                Pointer::Var(CsVar {
                    ctx: callee.ctx.clone(),
                    var: MethodVar {
                        method: callee.method.clone(),
                        var: *p,
                    },
                }),
            );
        }
        if let Some(dst) = dst {
            for ret in callee_method.return_vars() {
                self.add_pfg_edge(
                    Pointer::Var(CsVar {
                        ctx: callee.ctx.clone(),
                        var: MethodVar {
                            method: callee.method.clone(),
                            var: ret,
                        },
                    }),
                    Pointer::Var(CsVar {
                        ctx: caller.ctx.clone(),
                        var: MethodVar {
                            method: caller.method.clone(),
                            var: dst,
                        },
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
        ir::{CfgEdge, ClassId, Invoke, MethodBuilder, ProgramBuilder, Subsignature, Type},
        pta::context::KCallSiteSensitivity,
        pta::heap::AllocSiteHeapModel,
    };

    /// Two call sites invoking the same identity method through the same
    /// receiver must not conflate their arguments: under 1-call-site
    /// sensitivity, `id`'s parameter is analyzed once per call site, so
    /// each call's return value sees only its own argument's object.
    #[test]
    fn k_one_context_sensitivity_separates_call_sites() {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("A", false, Some(ClassId::from("Object")), vec![]);
        pb.class("Id", false, Some(ClassId::from("Object")), vec![]);
        pb.class("Main", false, None, vec![]);

        let sig = Subsignature::new("id()");
        let mut id_mb = MethodBuilder::new(sig.clone(), false).this(Type::Class(ClassId::from("Id")));
        let p = id_mb.param("p", Type::Class(ClassId::from("A")));
        id_mb.stmt(StmtId(0), StmtKind::Return(Some(p)));
        pb.method(&ClassId::from("Id"), id_mb);

        let mut main = MethodBuilder::new(Subsignature::new("main()"), true);
        let id_recv = main.var("idr", Type::Class(ClassId::from("Id")));
        let a1 = main.var("a1", Type::Class(ClassId::from("A")));
        let x1 = main.var("x1", Type::Class(ClassId::from("A")));
        let a2 = main.var("a2", Type::Class(ClassId::from("A")));
        let x2 = main.var("x2", Type::Class(ClassId::from("A")));
        main.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: id_recv,
                expr: Expr::New(ClassId::from("Id")),
            },
        );
        main.stmt(
            StmtId(1),
            StmtKind::Assign {
                dst: a1,
                expr: Expr::New(ClassId::from("A")),
            },
        );
        main.stmt(
            StmtId(2),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Virtual,
                method: MethodRef {
                    class: ClassId::from("Id"),
                    subsignature: sig.clone(),
                },
                receiver: Some(id_recv),
                args: vec![a1],
                dst: Some(x1),
            }),
        );
        main.stmt(
            StmtId(3),
            StmtKind::Assign {
                dst: a2,
                expr: Expr::New(ClassId::from("A")),
            },
        );
        main.stmt(
            StmtId(4),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Virtual,
                method: MethodRef {
                    class: ClassId::from("Id"),
                    subsignature: sig.clone(),
                },
                receiver: Some(id_recv),
                args: vec![a2],
                dst: Some(x2),
            }),
        );
        main.stmt(StmtId(5), StmtKind::Return(None));
        for i in 0..5 {
            main.edge(StmtId(i), StmtId(i + 1), CfgEdge::Normal);
        }
        pb.method(&ClassId::from("Main"), main);

        let program = pb.build();
        let main_id = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("main()"),
        };
        let id_method_id = MethodId {
            declaring_class: ClassId::from("Id"),
            subsignature: sig,
        };

        let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(1));
        let result = pta.solve(main_id.clone());

        let selector = KCallSiteSensitivity::new(1);
        let empty_ctx = Context::empty();
        let call_site1 = CallSite {
            caller: main_id.clone(),
            stmt: StmtId(2),
        };
        let call_site2 = CallSite {
            caller: main_id.clone(),
            stmt: StmtId(4),
        };
        let ctx1 = selector.select_context(&empty_ctx, &call_site1, &id_method_id);
        let ctx2 = selector.select_context(&empty_ctx, &call_site2, &id_method_id);
        assert_ne!(ctx1, ctx2);

        let pt_p_ctx1 = result.points_to_var(&ctx1, &id_method_id, p);
        let pt_p_ctx2 = result.points_to_var(&ctx2, &id_method_id, p);
        assert_eq!(pt_p_ctx1.len(), 1);
        assert_eq!(pt_p_ctx2.len(), 1);
        assert_ne!(pt_p_ctx1, pt_p_ctx2);

        let pt_x1 = result.points_to_var(&empty_ctx, &main_id, x1);
        let pt_x2 = result.points_to_var(&empty_ctx, &main_id, x2);
        assert_ne!(pt_x1, pt_x2);
    }
}

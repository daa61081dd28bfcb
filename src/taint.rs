//! `§4.G` -- the taint-propagation overlay. Layered on top of an already
//! frozen [`CsPtaResult`] rather than hooked into the solver itself
//! (`§9` open question 3): taint is carried as a parallel
//! `Pointer -> {TaintObj}` map propagated along the solved Pointer-Flow
//! Graph, which is semantically equivalent to conflating taint markers
//! with object identity in the points-to set but keeps the CS-PTA solver
//! free of taint-specific code.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    cha::CallSite,
    config::{TaintConfig, TransferEndpoint},
    ir::{Invoke, MethodId, Program, Type, VarId},
    pta::{
        context::CsMethod,
        cs::{CsVar, Ptr},
        pointer::{MethodVar, Pointer},
        CsPtaResult,
    },
};

/// A call site named without its analysis context -- the spec's notion of
/// "call site" is a static code location (`§3`: "Taint objects ... carry
/// (sourceCallSite, type)"), not one parameterized by calling context.
pub type PlainCallSite = CallSite<MethodId>;

/// A taint object: the call site that minted it and the type it is
/// currently carried as (`§3`). Transfers "retype" a taint object by
/// minting a fresh one with the same `source_call` and a new `ty`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaintObj {
    pub source_call: PlainCallSite,
    pub ty: Type,
}

/// Ensures one [`TaintObj`] per `(sourceCallSite, type)` pair (`§3`). A
/// thin interner: since `TaintObj` is a plain value, structural equality
/// already gives this property, but the manager documents and names the
/// invariant the way the spec's `TaintManager` collaborator does.
#[derive(Debug, Default)]
pub struct TaintManager {
    minted: BTreeSet<TaintObj>,
}

impl TaintManager {
    #[must_use]
    pub fn get_or_create(&mut self, source_call: PlainCallSite, ty: Type) -> TaintObj {
        let obj = TaintObj { source_call, ty };
        self.minted.insert(obj.clone());
        obj
    }
}

/// A witness that tainted data reaches a sink argument (`§4.G`,
/// `§6`/`§8` S6): `(sourceCallSite, sinkCallSite, sinkParamIndex)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaintFlow {
    pub source_call: PlainCallSite,
    pub sink_call: PlainCallSite,
    pub sink_param_index: usize,
}

/// Runs the taint pass (`§4.G`) over an already-solved [`CsPtaResult`],
/// driven by a resolved [`TaintConfig`].
pub struct TaintAnalysis<'p> {
    program: &'p Program,
    pta: &'p CsPtaResult,
    config: &'p TaintConfig,
}

impl<'p> TaintAnalysis<'p> {
    #[must_use]
    pub fn new(program: &'p Program, pta: &'p CsPtaResult, config: &'p TaintConfig) -> Self {
        Self { program, pta, config }
    }

    /// Runs to a fixed point and returns the ordered set of taint flows
    /// (`§4.G` hook 3, "onFinish").
    #[must_use]
    pub fn run(&self) -> BTreeSet<TaintFlow> {
        let mut manager = TaintManager::default();
        let mut facts: BTreeMap<Ptr, BTreeSet<TaintObj>> = BTreeMap::new();
        let mut worklist: VecDeque<Ptr> = VecDeque::new();

        self.seed_sources(&mut manager, &mut facts, &mut worklist);

        loop {
            self.propagate_along_pfg(&mut facts, &mut worklist);
            if !self.apply_transfers(&mut manager, &mut facts, &mut worklist) {
                break;
            }
        }

        self.collect_sink_flows(&facts)
    }

    fn invoke_at(&self, call_site: &CallSite<CsMethod>) -> Option<&Invoke> {
        self.program
            .method(&call_site.caller.method)
            .and_then(|m| m.cfg())
            .and_then(|cfg| cfg.node(call_site.stmt))
            .and_then(crate::ir::StmtKind::as_invoke)
    }

    fn plain(&self, call_site: &CallSite<CsMethod>) -> PlainCallSite {
        CallSite {
            caller: call_site.caller.method.clone(),
            stmt: call_site.stmt,
        }
    }

    fn cs_var(&self, ctx: &crate::pta::context::Context, method: &MethodId, var: VarId) -> Ptr {
        Pointer::Var(CsVar {
            ctx: ctx.clone(),
            var: MethodVar {
                method: method.clone(),
                var,
            },
        })
    }

    fn endpoint_ptr(
        &self,
        call_site: &CallSite<CsMethod>,
        inv: &Invoke,
        endpoint: TransferEndpoint,
    ) -> Option<Ptr> {
        let var = match endpoint {
            TransferEndpoint::Base => inv.receiver?,
            TransferEndpoint::Result => inv.dst?,
            TransferEndpoint::Arg(i) => *inv.args.get(i)?,
        };
        Some(self.cs_var(&call_site.caller.ctx, &call_site.caller.method, var))
    }

    /// Hook 1 (`§4.G`): on a reachable invocation matching a configured
    /// `Source`, mint a taint object and inject it into the call's
    /// lvalue.
    fn seed_sources(
        &self,
        manager: &mut TaintManager,
        facts: &mut BTreeMap<Ptr, BTreeSet<TaintObj>>,
        worklist: &mut VecDeque<Ptr>,
    ) {
        for (call_site, (_, callee)) in self.pta.call_graph().edges() {
            let Some(inv) = self.invoke_at(call_site) else {
                continue;
            };
            let Some(source) = self
                .config
                .sources
                .iter()
                .find(|s| s.method.to_method_id() == callee.method)
            else {
                continue;
            };
            let Some(dst) = inv.dst else { continue };
            let obj = manager.get_or_create(self.plain(call_site), source.return_type.clone());
            let ptr = self.cs_var(&call_site.caller.ctx, &call_site.caller.method, dst);
            if facts.entry(ptr.clone()).or_default().insert(obj) {
                worklist.push_back(ptr);
            }
        }
    }

    /// Propagates taint along the PFG the CS-PTA solve already computed:
    /// an edge `src -> tgt` means every taint object on `src` must also
    /// be on `tgt`, exactly as for points-to objects (`§3`).
    fn propagate_along_pfg(
        &self,
        facts: &mut BTreeMap<Ptr, BTreeSet<TaintObj>>,
        worklist: &mut VecDeque<Ptr>,
    ) {
        while let Some(ptr) = worklist.pop_front() {
            let taints = facts.get(&ptr).cloned().unwrap_or_default();
            if taints.is_empty() {
                continue;
            }
            let successors: Vec<Ptr> = self.pta.pfg_successors(&ptr).cloned().collect();
            for succ in successors {
                let entry = facts.entry(succ.clone()).or_default();
                let mut changed = false;
                for obj in &taints {
                    changed |= entry.insert(obj.clone());
                }
                if changed {
                    worklist.push_back(succ);
                }
            }
        }
    }

    /// Hook 2 (`§4.G`): for every invocation matching a configured
    /// `Transfer`, moves (retyped) taint between the transfer's
    /// endpoints. Returns whether any fact changed, so the caller can
    /// alternate this with PFG propagation until neither makes progress.
    fn apply_transfers(
        &self,
        manager: &mut TaintManager,
        facts: &mut BTreeMap<Ptr, BTreeSet<TaintObj>>,
        worklist: &mut VecDeque<Ptr>,
    ) -> bool {
        let mut any_change = false;
        for (call_site, (_, callee)) in self.pta.call_graph().edges() {
            let Some(inv) = self.invoke_at(call_site) else {
                continue;
            };
            for transfer in self
                .config
                .transfers
                .iter()
                .filter(|t| t.method.to_method_id() == callee.method)
            {
                let (Some(from_ptr), Some(to_ptr)) = (
                    self.endpoint_ptr(call_site, inv, transfer.from),
                    self.endpoint_ptr(call_site, inv, transfer.to),
                ) else {
                    continue;
                };
                let from_taints = facts.get(&from_ptr).cloned().unwrap_or_default();
                if from_taints.is_empty() {
                    continue;
                }
                let entry = facts.entry(to_ptr.clone()).or_default();
                let mut changed = false;
                for obj in from_taints {
                    let retyped = manager.get_or_create(obj.source_call, transfer.ty.clone());
                    changed |= entry.insert(retyped);
                }
                if changed {
                    any_change = true;
                    worklist.push_back(to_ptr);
                }
            }
        }
        any_change
    }

    /// Hook 3 (`§4.G`): walk every reachable call site; for each
    /// configured `Sink`, every tainted object reaching its argument
    /// position produces a flow.
    fn collect_sink_flows(&self, facts: &BTreeMap<Ptr, BTreeSet<TaintObj>>) -> BTreeSet<TaintFlow> {
        let mut flows = BTreeSet::new();
        for (call_site, (_, callee)) in self.pta.call_graph().edges() {
            let Some(inv) = self.invoke_at(call_site) else {
                continue;
            };
            for sink in self
                .config
                .sinks
                .iter()
                .filter(|s| s.method.to_method_id() == callee.method)
            {
                let Some(&arg) = inv.args.get(sink.param_index) else {
                    continue;
                };
                let ptr = self.cs_var(&call_site.caller.ctx, &call_site.caller.method, arg);
                let Some(taints) = facts.get(&ptr) else {
                    continue;
                };
                for obj in taints {
                    flows.insert(TaintFlow {
                        source_call: obj.source_call.clone(),
                        sink_call: self.plain(call_site),
                        sink_param_index: sink.param_index,
                    });
                }
            }
        }
        flows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{MethodSignature, SinkSpec, SourceSpec, TransferSpec},
        ir::{
            CallKind, CfgEdge, ClassId, Expr, MethodBuilder, MethodRef, ProgramBuilder, StmtId,
            StmtKind, Subsignature, Type, types::PrimitiveType,
        },
        pta::{context::KCallSiteSensitivity, heap::AllocSiteHeapModel, CsPta},
    };

    fn string_ty() -> Type {
        Type::Class(ClassId::from("String"))
    }

    /// S6: `s = readSecret(); t = "x".concat(s); log(0, t);` with source
    /// `readSecret()`, sink `log(1)`, transfer `concat(arg 0 -> result)`.
    /// Exactly one `TaintFlow(readSecret-site, log-site, 1)` must result.
    #[test]
    fn s6_taint_flows_from_source_through_transfer_to_sink() {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("String", false, Some(ClassId::from("Object")), vec![]);
        pb.class("Io", false, Some(ClassId::from("Object")), vec![]);
        pb.class("Main", false, None, vec![]);

        let concat_sig = Subsignature::new("concat(Ljava/lang/String;)");
        let mut concat_mb = MethodBuilder::new(concat_sig.clone(), false)
            .this(string_ty());
        let concat_arg = concat_mb.param("s", string_ty());
        let concat_ret = concat_mb.var("r", string_ty());
        concat_mb.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: concat_ret,
                expr: Expr::New(ClassId::from("String")),
            },
        );
        concat_mb.stmt(StmtId(1), StmtKind::Return(Some(concat_ret)));
        concat_mb.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        pb.method(&ClassId::from("String"), concat_mb);
        let _ = concat_arg;

        let read_secret_sig = Subsignature::new("readSecret()");
        let mut read_mb = MethodBuilder::new(read_secret_sig.clone(), true);
        let read_ret = read_mb.var("r", string_ty());
        read_mb.stmt(
            StmtId(0),
            StmtKind::Assign { dst: read_ret, expr: Expr::New(ClassId::from("String")) },
        );
        read_mb.stmt(StmtId(1), StmtKind::Return(Some(read_ret)));
        read_mb.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        pb.method(&ClassId::from("Io"), read_mb);

        let log_sig = Subsignature::new("log(ILjava/lang/Object;)");
        let mut log_mb = MethodBuilder::new(log_sig.clone(), true);
        let tag = log_mb.param("tag", Type::Primitive(PrimitiveType::Int));
        let msg = log_mb.param("msg", string_ty());
        log_mb.stmt(StmtId(0), StmtKind::Return(None));
        let _ = (tag, msg);
        pb.method(&ClassId::from("Io"), log_mb);

        let mut main = MethodBuilder::new(Subsignature::new("main()"), true);
        let recv = main.var("recv", string_ty());
        let s = main.var("s", string_ty());
        let t = main.var("t", string_ty());
        let zero = main.var("zero", Type::Primitive(PrimitiveType::Int));
        main.stmt(
            StmtId(0),
            StmtKind::Assign { dst: recv, expr: Expr::New(ClassId::from("String")) },
        );
        main.stmt(
            StmtId(1),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Static,
                method: MethodRef { class: ClassId::from("Io"), subsignature: read_secret_sig.clone() },
                receiver: None,
                args: vec![],
                dst: Some(s),
            }),
        );
        main.stmt(
            StmtId(2),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Virtual,
                method: MethodRef { class: ClassId::from("String"), subsignature: concat_sig.clone() },
                receiver: Some(recv),
                args: vec![s],
                dst: Some(t),
            }),
        );
        main.stmt(
            StmtId(3),
            StmtKind::Assign { dst: zero, expr: Expr::Value(crate::ir::RValue::IntLiteral(0)) },
        );
        main.stmt(
            StmtId(4),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Static,
                method: MethodRef { class: ClassId::from("Io"), subsignature: log_sig.clone() },
                receiver: None,
                args: vec![zero, t],
                dst: None,
            }),
        );
        main.stmt(StmtId(5), StmtKind::Return(None));
        for i in 0..5 {
            main.edge(StmtId(i), StmtId(i + 1), CfgEdge::Normal);
        }
        pb.method(&ClassId::from("Main"), main);

        let program = pb.build();
        let main_id = crate::ir::MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("main()"),
        };

        let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(1));
        let result = pta.solve(main_id);

        let config = TaintConfig {
            sources: vec![SourceSpec {
                method: MethodSignature { class: "Io".into(), subsignature: "readSecret()".into() },
                return_type: string_ty(),
            }],
            sinks: vec![SinkSpec {
                method: MethodSignature {
                    class: "Io".into(),
                    subsignature: "log(ILjava/lang/Object;)".into(),
                },
                param_index: 1,
            }],
            transfers: vec![TransferSpec {
                method: MethodSignature {
                    class: "String".into(),
                    subsignature: "concat(Ljava/lang/String;)".into(),
                },
                from: TransferEndpoint::Arg(0),
                to: TransferEndpoint::Result,
                ty: string_ty(),
            }],
        };

        let analysis = TaintAnalysis::new(&program, &result, &config);
        let flows = analysis.run();
        assert_eq!(flows.len(), 1);
        let flow = flows.iter().next().unwrap();
        assert_eq!(flow.source_call.stmt, StmtId(1));
        assert_eq!(flow.sink_call.stmt, StmtId(4));
        assert_eq!(flow.sink_param_index, 1);
    }
}

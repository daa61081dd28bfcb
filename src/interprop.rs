//! `§4.F` -- inter-procedural constant propagation over the ICFG,
//! consuming a frozen [`CsPtaResult`] for field/array aliasing. Unlike the
//! intraprocedural analysis in [`crate::dataflow::const_prop`], field and
//! array loads are no longer treated as `NAC`: their value is the meet of
//! every points-to object's current heap fact.
//!
//! The heap (instance fields, static fields, array cells) is not part of
//! any single node's fact -- it is shared mutable state threaded through
//! the whole fixpoint, the way a global store would be in an operational
//! semantics. A write re-queues every load site the precomputed alias
//! index says could observe it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    dataflow::StmtFacts,
    icfg::{Icfg, IcfgEdge, IcfgNode},
    ir::{Expr, FieldBase, FieldRef, Invoke, Program, RValue, StmtKind},
    lattice::{CPFact, MeetSemilattice, Value},
    pta::{CsPtaResult, context::CsMethod, heap::Obj},
};

/// The heap-sensitive facts this pass threads alongside the per-node
/// `CPFact`s: one value per `(object, field)`, per static field, and one
/// per `(object, index)` for arrays, with a distinct `(object, NAC)`
/// bucket for writes/reads at an unknown index (`§4.F`: this scalar value
/// map is index-sensitive, unlike the `ArrayIndex(Obj)` *pointer* the PFG
/// uses in `§3`/`§4.D-E` -- that merging governs points-to, not this map).
#[derive(Debug, Default)]
struct HeapFacts {
    instance: BTreeMap<(Obj, FieldRef), Value>,
    statics: BTreeMap<FieldRef, Value>,
    arrays: BTreeMap<(Obj, Value), Value>,
}

impl HeapFacts {
    fn instance_get(&self, obj: &Obj, field: &FieldRef) -> Value {
        self.instance
            .get(&(obj.clone(), field.clone()))
            .copied()
            .unwrap_or(Value::Undef)
    }

    /// Weak update: merges `value` into the existing fact for the key
    /// rather than overwriting it, since more than one variable/context
    /// may alias the same object. Returns whether the fact changed.
    fn instance_merge(&mut self, obj: Obj, field: FieldRef, value: Value) -> bool {
        let entry = self.instance.entry((obj, field)).or_insert(Value::Undef);
        let merged = entry.meet(&value);
        let changed = *entry != merged;
        *entry = merged;
        changed
    }

    fn static_get(&self, field: &FieldRef) -> Value {
        self.statics.get(field).copied().unwrap_or(Value::Undef)
    }

    fn static_merge(&mut self, field: FieldRef, value: Value) -> bool {
        let entry = self.statics.entry(field).or_insert(Value::Undef);
        let merged = entry.meet(&value);
        let changed = *entry != merged;
        *entry = merged;
        changed
    }

    /// A read at a constant index meets `arrayMap[(obj,i)]` and
    /// `arrayMap[(obj,NAC)]` (a NAC-indexed write may also have landed on
    /// this cell); a read at a NAC index meets every entry recorded for
    /// `obj`, at any index (`§4.F`).
    fn array_get(&self, obj: &Obj, index: Value) -> Value {
        match index {
            Value::Nac => self
                .arrays
                .range((obj.clone(), Value::Undef)..)
                .take_while(|((o, _), _)| o == obj)
                .fold(Value::Undef, |acc, (_, v)| acc.meet(v)),
            Value::Const(_) => {
                let at_index = self.arrays.get(&(obj.clone(), index)).copied().unwrap_or(Value::Undef);
                let at_nac = self.arrays.get(&(obj.clone(), Value::Nac)).copied().unwrap_or(Value::Undef);
                at_index.meet(&at_nac)
            }
            Value::Undef => Value::Undef,
        }
    }

    /// A write at `UNDEF` index is skipped entirely (`§4.F`: "if `i` is
    /// UNDEF skip"); a write at a constant or NAC index merges into that
    /// index's bucket, same weak-update rule as instance/static fields.
    fn array_merge(&mut self, obj: Obj, index: Value, value: Value) -> bool {
        if index == Value::Undef {
            return false;
        }
        let entry = self.arrays.entry((obj, index)).or_insert(Value::Undef);
        let merged = entry.meet(&value);
        let changed = *entry != merged;
        *entry = merged;
        changed
    }
}

/// The frozen result of an inter-procedural constant-propagation solve:
/// the `IN`/`OUT` fact at every ICFG node reached.
#[derive(Debug, Default)]
pub struct InterPropResult {
    facts: BTreeMap<IcfgNode, StmtFacts<CPFact>>,
}

impl InterPropResult {
    /// The value of `var` in the `OUT` fact of `node`'s method, i.e. right
    /// after `node`'s statement executes under that context.
    #[must_use]
    pub fn value_after(&self, node: &IcfgNode, var: crate::ir::VarId) -> Value {
        self.facts
            .get(node)
            .map_or(Value::Undef, |f| f.out.get(var))
    }

    /// The raw `IN`/`OUT` fact pair at `node`, if it was reached.
    #[must_use]
    pub fn facts_at(&self, node: &IcfgNode) -> Option<&StmtFacts<CPFact>> {
        self.facts.get(node)
    }
}

/// Inter-procedural constant propagation (`§4.F`): a fixpoint over an
/// [`Icfg`] and the heap facts its `LoadField`/`LoadArray`/`StoreField`/
/// `StoreArray` statements read and write, driven by the alias
/// information a [`CsPtaResult`] already computed.
pub struct InterProcConstProp<'p> {
    program: &'p Program,
    pta: &'p CsPtaResult,
    icfg: &'p Icfg,
}

impl<'p> InterProcConstProp<'p> {
    #[must_use]
    pub fn new(program: &'p Program, pta: &'p CsPtaResult, icfg: &'p Icfg) -> Self {
        Self { program, pta, icfg }
    }

    /// Runs the fixpoint to completion, starting from `entry` analyzed
    /// under the empty context (`§4.E` boundary convention).
    ///
    /// # Panics
    /// Panics if `entry`'s body is missing from `self.program`.
    #[must_use]
    pub fn solve(&self, entry: &CsMethod) -> InterPropResult {
        let entry_node = self.entry_node(entry);
        let load_field_index = self.build_load_field_index();
        let load_static_index = self.build_load_static_index();
        let load_array_index = self.build_load_array_index();

        let mut facts: BTreeMap<IcfgNode, StmtFacts<CPFact>> = self
            .icfg
            .nodes()
            .map(|n| (n.clone(), StmtFacts { inn: CPFact::bottom(), out: CPFact::bottom() }))
            .collect();
        let mut heap = HeapFacts::default();

        let mut worklist: VecDeque<IcfgNode> = VecDeque::from([entry_node.clone()]);
        let mut queued: BTreeSet<IcfgNode> = BTreeSet::from([entry_node]);

        while let Some(node) = worklist.pop_front() {
            queued.remove(&node);
            let Some(stmt) = self.stmt_at(&node) else { continue };

            let inn = self.compute_in(&node, entry, &facts);
            let (out, dirtied) = self.transfer(&node, stmt, &inn, &mut heap);

            let entry_facts = facts.get_mut(&node).expect("node fact pre-seeded");
            let changed = entry_facts.inn != inn || entry_facts.out != out;
            entry_facts.inn = inn;
            entry_facts.out = out;

            if changed {
                for (_, succ) in self.icfg.edges_from(&node) {
                    if queued.insert(succ.clone()) {
                        worklist.push_back(succ.clone());
                    }
                }
            }
            for key in dirtied {
                let dependents: Vec<IcfgNode> = match key {
                    DirtiedKey::Instance(obj, field) => load_field_index
                        .get(&(obj, field))
                        .into_iter()
                        .flatten()
                        .cloned()
                        .collect(),
                    DirtiedKey::Static(field) => load_static_index
                        .get(&field)
                        .into_iter()
                        .flatten()
                        .cloned()
                        .collect(),
                    DirtiedKey::Array(obj) => load_array_index
                        .get(&obj)
                        .into_iter()
                        .flatten()
                        .cloned()
                        .collect(),
                };
                for dep in dependents {
                    if queued.insert(dep.clone()) {
                        worklist.push_back(dep);
                    }
                }
            }
        }

        InterPropResult { facts }
    }

    fn entry_node(&self, entry: &CsMethod) -> IcfgNode {
        let cfg = self
            .program
            .method(&entry.method)
            .and_then(|m| m.cfg())
            .expect("entry method has a body");
        IcfgNode {
            method: entry.clone(),
            stmt: cfg.entry_point(),
        }
    }

    fn stmt_at(&self, node: &IcfgNode) -> Option<&StmtKind> {
        self.program
            .method(&node.method.method)
            .and_then(|m| m.cfg())
            .and_then(|cfg| cfg.node(node.stmt))
    }

    fn invoke_at(&self, node: &IcfgNode) -> Option<&Invoke> {
        self.stmt_at(node).and_then(StmtKind::as_invoke)
    }

    /// `IN(node) = meet over predecessors of edge_transform(pred.OUT)`,
    /// except at the analysis entry, which additionally meets in the
    /// boundary fact (`§4.C` convention, lifted to the whole program: an
    /// int-typed parameter of the entry method is `NAC`, since its caller
    /// is unknown).
    fn compute_in(
        &self,
        node: &IcfgNode,
        entry: &CsMethod,
        facts: &BTreeMap<IcfgNode, StmtFacts<CPFact>>,
    ) -> CPFact {
        let mut result = CPFact::bottom();
        if node.method == *entry && Some(node.stmt) == self.entry_stmt(&node.method) {
            result = boundary_fact(self.program, &node.method.method);
        }
        for (edge, pred) in self.icfg.edges_into(node) {
            let Some(pred_facts) = facts.get(pred) else { continue };
            let projected = self.project_edge(edge, pred, node, &pred_facts.out);
            result = result.meet(&projected);
        }
        result
    }

    fn entry_stmt(&self, method: &CsMethod) -> Option<crate::ir::StmtId> {
        self.program
            .method(&method.method)
            .and_then(|m| m.cfg())
            .map(|cfg| cfg.entry_point())
    }

    /// Projects a predecessor's `OUT` fact across one ICFG edge into the
    /// successor's `IN` contribution (`§4.F`).
    fn project_edge(&self, edge: &IcfgEdge, pred: &IcfgNode, succ: &IcfgNode, pred_out: &CPFact) -> CPFact {
        match edge {
            IcfgEdge::Normal => pred_out.clone(),
            IcfgEdge::CallToReturn { call_site } => {
                let mut fact = pred_out.clone();
                if let Some(inv) = self.invoke_at(call_site) {
                    if let Some(dst) = inv.dst {
                        // Killed to UNDEF, not NAC: the real value (if any)
                        // arrives via the matching Return edge and is
                        // meet-combined with this one, and UNDEF is the
                        // meet identity while NAC would swamp it.
                        fact.set(dst, Value::Undef);
                    }
                }
                fact
            }
            IcfgEdge::Call { call_site } => {
                let mut fact = CPFact::bottom();
                let Some(inv) = self.invoke_at(call_site) else { return fact };
                let Some(callee) = self.program.method(&succ.method.method) else { return fact };
                for (&arg, &param) in inv.args.iter().zip(callee.params.iter()) {
                    if callee.var_type(param).can_hold_int() {
                        fact.set(param, pred_out.get(arg));
                    }
                }
                fact
            }
            IcfgEdge::Return { call_site } => {
                let mut fact = CPFact::bottom();
                let Some(inv) = self.invoke_at(call_site) else { return fact };
                let Some(dst) = inv.dst else { return fact };
                let Some(StmtKind::Return(Some(ret_var))) = self.stmt_at(pred) else {
                    return fact;
                };
                let Some(caller) = self.program.method(&call_site.method.method) else {
                    return fact;
                };
                if caller.var_type(dst).can_hold_int() {
                    fact.set(dst, pred_out.get(*ret_var));
                }
                fact
            }
        }
    }

    /// The per-statement transfer at `node`: identical to the
    /// intraprocedural rule for everything except field/array
    /// loads/stores, which consult/update `heap` via the object(s) `node`'s
    /// base variable points to. Returns the new `OUT` fact plus the heap
    /// keys this statement wrote (so the caller can re-queue their load
    /// sites).
    fn transfer(
        &self,
        node: &IcfgNode,
        stmt: &StmtKind,
        inn: &CPFact,
        heap: &mut HeapFacts,
    ) -> (CPFact, Vec<DirtiedKey>) {
        let mut out = inn.clone();
        let mut dirtied = Vec::new();
        let Some(method) = self.program.method(&node.method.method) else {
            return (out, dirtied);
        };

        match stmt {
            StmtKind::Assign { dst, expr } if method.var_type(*dst).can_hold_int() => {
                let value = self.evaluate_expr(node, expr, inn, heap);
                out.set(*dst, value);
            }
            StmtKind::StoreField {
                base: FieldBase::Instance(base),
                field,
                src,
            } => {
                let value = inn.get(*src);
                for obj in self.pts_of(node, *base).iter() {
                    if heap.instance_merge(obj.obj.clone(), field.clone(), value) {
                        dirtied.push(DirtiedKey::Instance(obj.obj.clone(), field.clone()));
                    }
                }
            }
            StmtKind::StoreField {
                base: FieldBase::Static,
                field,
                src,
            } => {
                let value = inn.get(*src);
                if heap.static_merge(field.clone(), value) {
                    dirtied.push(DirtiedKey::Static(field.clone()));
                }
            }
            StmtKind::StoreArray { array, index, src } => {
                let index_value = evaluate_local(index, inn);
                if index_value != Value::Undef {
                    let value = inn.get(*src);
                    for obj in self.pts_of(node, *array).iter() {
                        if heap.array_merge(obj.obj.clone(), index_value, value) {
                            dirtied.push(DirtiedKey::Array(obj.obj.clone()));
                        }
                    }
                }
            }
            _ => {}
        }
        (out, dirtied)
    }

    fn evaluate_expr(&self, node: &IcfgNode, expr: &Expr, inn: &CPFact, heap: &HeapFacts) -> Value {
        match expr {
            Expr::Value(rv) => evaluate_local(rv, inn),
            Expr::LoadField {
                base: FieldBase::Instance(base),
                field,
            } => {
                let pts = self.pts_of(node, *base);
                if pts.is_empty() {
                    return Value::Undef;
                }
                let mut value = Value::Undef;
                for obj in pts.iter() {
                    value = value.meet(&heap.instance_get(&obj.obj, field));
                }
                value
            }
            Expr::LoadField {
                base: FieldBase::Static,
                field,
            } => heap.static_get(field),
            Expr::LoadArray { array, index } => {
                let pts = self.pts_of(node, *array);
                if pts.is_empty() {
                    return Value::Undef;
                }
                let index_value = evaluate_local(index, inn);
                let mut value = Value::Undef;
                for obj in pts.iter() {
                    value = value.meet(&heap.array_get(&obj.obj, index_value));
                }
                value
            }
            Expr::New(_) | Expr::Cast { .. } => Value::Nac,
        }
    }

    fn pts_of(&self, node: &IcfgNode, var: crate::ir::VarId) -> crate::pta::PointsToSet<crate::pta::context::CsObj> {
        self.pta.points_to_var(&node.method.ctx, &node.method.method, var)
    }

    fn build_load_field_index(&self) -> BTreeMap<(Obj, FieldRef), BTreeSet<IcfgNode>> {
        let mut index: BTreeMap<(Obj, FieldRef), BTreeSet<IcfgNode>> = BTreeMap::new();
        for node in self.icfg.nodes() {
            if let Some(StmtKind::Assign {
                expr: Expr::LoadField { base: FieldBase::Instance(base), field },
                ..
            }) = self.stmt_at(node)
            {
                for obj in self.pts_of(node, *base).iter() {
                    index
                        .entry((obj.obj.clone(), field.clone()))
                        .or_default()
                        .insert(node.clone());
                }
            }
        }
        index
    }

    fn build_load_static_index(&self) -> BTreeMap<FieldRef, BTreeSet<IcfgNode>> {
        let mut index: BTreeMap<FieldRef, BTreeSet<IcfgNode>> = BTreeMap::new();
        for node in self.icfg.nodes() {
            if let Some(StmtKind::Assign {
                expr: Expr::LoadField { base: FieldBase::Static, field },
                ..
            }) = self.stmt_at(node)
            {
                index.entry(field.clone()).or_default().insert(node.clone());
            }
        }
        index
    }

    fn build_load_array_index(&self) -> BTreeMap<Obj, BTreeSet<IcfgNode>> {
        let mut index: BTreeMap<Obj, BTreeSet<IcfgNode>> = BTreeMap::new();
        for node in self.icfg.nodes() {
            if let Some(StmtKind::Assign {
                expr: Expr::LoadArray { array, .. },
                ..
            }) = self.stmt_at(node)
            {
                for obj in self.pts_of(node, *array).iter() {
                    index.entry(obj.obj.clone()).or_default().insert(node.clone());
                }
            }
        }
        index
    }
}

/// A heap location a `StoreField`/`StoreArray` statement just wrote,
/// reported so its dependent load sites can be re-queued.
enum DirtiedKey {
    Instance(Obj, FieldRef),
    Static(FieldRef),
    Array(Obj),
}

/// `evaluate` restricted to a single method's local facts -- the plain
/// `RValue` case, shared with the intraprocedural analysis's semantics
/// but duplicated here since this pass's `CPFact` also depends on heap
/// reads the intraprocedural `evaluate` doesn't know about.
fn evaluate_local(rvalue: &RValue, fact: &CPFact) -> Value {
    crate::dataflow::const_prop::evaluate(rvalue, fact)
}

/// The boundary fact for the whole-program entry method: every int-typed
/// parameter is `NAC` (unknown caller), mirroring
/// [`crate::dataflow::const_prop::ConstantPropagation::boundary_fact`].
fn boundary_fact(program: &Program, method: &crate::ir::MethodId) -> CPFact {
    let mut fact = CPFact::new();
    if let Some(m) = program.method(method) {
        for &param in &m.params {
            if m.var_type(param).can_hold_int() {
                fact.set(param, Value::Nac);
            }
        }
    }
    fact
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        icfg::build_icfg,
        ir::{
            CallKind, ClassId, FieldRef, Invoke, MethodBuilder, MethodId, MethodRef, ProgramBuilder,
            StmtId, Subsignature, Type, types::PrimitiveType,
        },
        pta::{CsPta, context::KCallSiteSensitivity, heap::AllocSiteHeapModel},
    };

    fn int_ty() -> Type {
        Type::Primitive(PrimitiveType::Int)
    }

    /// S5: `C c = new C(); c.f = 5; int x = get(c);` where
    /// `static int get(C c) { return c.f; }`. The only object `c` can
    /// point to carries `f = CONST(5)`, so `x` must resolve to `CONST(5)`
    /// after the call returns, even though the read happens in a
    /// different method than the write.
    fn scenario_s5() -> (crate::ir::Program, MethodId, MethodId, crate::ir::VarId) {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("C", false, Some(ClassId::from("Object")), vec![]);
        let f = FieldRef {
            declaring_class: ClassId::from("C"),
            name: "f".into(),
            ty: int_ty(),
        };
        pb.field(&ClassId::from("C"), f.clone());
        pb.class("Main", false, None, vec![]);

        let mut get_mb = MethodBuilder::new(Subsignature::new("get(C)"), true);
        let c_param = get_mb.param("c", Type::Class(ClassId::from("C")));
        let ret = get_mb.var("r", int_ty());
        get_mb.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: ret,
                expr: Expr::LoadField {
                    base: FieldBase::Instance(c_param),
                    field: f.clone(),
                },
            },
        );
        get_mb.stmt(StmtId(1), StmtKind::Return(Some(ret)));
        get_mb.edge(StmtId(0), StmtId(1), crate::ir::CfgEdge::Normal);
        pb.method(&ClassId::from("Main"), get_mb);

        let mut main_mb = MethodBuilder::new(Subsignature::new("main()"), true);
        let c = main_mb.var("c", Type::Class(ClassId::from("C")));
        let five = main_mb.var("five", int_ty());
        let x = main_mb.var("x", int_ty());
        main_mb.stmt(
            StmtId(0),
            StmtKind::Assign { dst: c, expr: Expr::New(ClassId::from("C")) },
        );
        main_mb.stmt(
            StmtId(1),
            StmtKind::Assign { dst: five, expr: Expr::Value(RValue::IntLiteral(5)) },
        );
        main_mb.stmt(
            StmtId(2),
            StmtKind::StoreField { base: FieldBase::Instance(c), field: f, src: five },
        );
        main_mb.stmt(
            StmtId(3),
            StmtKind::Invoke(Invoke {
                kind: CallKind::Static,
                method: MethodRef {
                    class: ClassId::from("Main"),
                    subsignature: Subsignature::new("get(C)"),
                },
                receiver: None,
                args: vec![c],
                dst: Some(x),
            }),
        );
        main_mb.stmt(StmtId(4), StmtKind::Return(None));
        for i in 0..4 {
            main_mb.edge(StmtId(i), StmtId(i + 1), crate::ir::CfgEdge::Normal);
        }
        pb.method(&ClassId::from("Main"), main_mb);

        let program = pb.build();
        let main_id = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("main()"),
        };
        let get_id = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("get(C)"),
        };
        (program, main_id, get_id, x)
    }

    #[test]
    fn s5_constant_flows_through_a_field_across_a_call() {
        let (program, main_id, _get_id, x) = scenario_s5();
        let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(1));
        let result = pta.solve(main_id.clone());
        let icfg = build_icfg(&program, result.call_graph());

        let entry = CsMethod {
            ctx: crate::pta::context::Context::empty(),
            method: main_id,
        };
        let analysis = InterProcConstProp::new(&program, &result, &icfg);
        let solved = analysis.solve(&entry);

        let ret_node = IcfgNode { method: entry, stmt: StmtId(4) };
        assert_eq!(solved.value_after(&ret_node, x), Value::Const(5));
    }

    /// `a[0] = 5; a[1] = 7; x = a[0];` must resolve `x` to `CONST(5)`: the
    /// array heap map is index-sensitive, so the write at index 1 must not
    /// clobber the fact recorded at index 0 (`§4.F`).
    #[test]
    fn array_store_load_is_index_sensitive() {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("IntArray", false, Some(ClassId::from("Object")), vec![]);
        pb.class("Main", false, None, vec![]);

        let mut main_mb = MethodBuilder::new(Subsignature::new("main()"), true);
        let a = main_mb.var("a", Type::Array(Box::new(int_ty())));
        let five = main_mb.var("five", int_ty());
        let seven = main_mb.var("seven", int_ty());
        let zero = main_mb.var("zero", int_ty());
        let one = main_mb.var("one", int_ty());
        let x = main_mb.var("x", int_ty());
        main_mb.stmt(
            StmtId(0),
            StmtKind::Assign { dst: a, expr: Expr::New(ClassId::from("IntArray")) },
        );
        main_mb.stmt(
            StmtId(1),
            StmtKind::Assign { dst: five, expr: Expr::Value(RValue::IntLiteral(5)) },
        );
        main_mb.stmt(
            StmtId(2),
            StmtKind::Assign { dst: seven, expr: Expr::Value(RValue::IntLiteral(7)) },
        );
        main_mb.stmt(
            StmtId(3),
            StmtKind::Assign { dst: zero, expr: Expr::Value(RValue::IntLiteral(0)) },
        );
        main_mb.stmt(
            StmtId(4),
            StmtKind::Assign { dst: one, expr: Expr::Value(RValue::IntLiteral(1)) },
        );
        main_mb.stmt(
            StmtId(5),
            StmtKind::StoreArray { array: a, index: RValue::Var(zero), src: five },
        );
        main_mb.stmt(
            StmtId(6),
            StmtKind::StoreArray { array: a, index: RValue::Var(one), src: seven },
        );
        main_mb.stmt(
            StmtId(7),
            StmtKind::Assign {
                dst: x,
                expr: Expr::LoadArray { array: a, index: RValue::Var(zero) },
            },
        );
        main_mb.stmt(StmtId(8), StmtKind::Return(None));
        for i in 0..8 {
            main_mb.edge(StmtId(i), StmtId(i + 1), crate::ir::CfgEdge::Normal);
        }
        pb.method(&ClassId::from("Main"), main_mb);

        let program = pb.build();
        let main_id = MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new("main()"),
        };

        let pta = CsPta::new(&program, AllocSiteHeapModel, KCallSiteSensitivity::new(1));
        let result = pta.solve(main_id.clone());
        let icfg = build_icfg(&program, result.call_graph());

        let entry = CsMethod {
            ctx: crate::pta::context::Context::empty(),
            method: main_id,
        };
        let analysis = InterProcConstProp::new(&program, &result, &icfg);
        let solved = analysis.solve(&entry);

        let store_node = IcfgNode { method: entry.clone(), stmt: StmtId(7) };
        assert_eq!(solved.value_after(&store_node, x), Value::Const(5));
    }
}

//! `§4.H` -- dead-code detection: an unreachable-code pass driven by the
//! constant-propagation result, plus a dead-assignment pass driven by the
//! live-variable result. Runs per method, after both intraprocedural
//! analyses have already solved to a fixed point.

use std::collections::{BTreeSet, VecDeque};

use crate::{
    dataflow::{StmtFacts, const_prop::evaluate},
    ir::{CfgEdge, Method, StmtId, StmtKind, VarId},
    lattice::{CPFact, SetFact, Value},
};

/// The dead statements of a method: unreachable code plus assignments
/// whose result is never used, deduplicated into one set. The CFG exit is
/// never reported, even when unreachable (`§4.H`, `§8` invariant 7).
#[must_use]
pub fn detect(
    method: &Method,
    const_prop: &std::collections::BTreeMap<StmtId, StmtFacts<CPFact>>,
    live_vars: &std::collections::BTreeMap<StmtId, StmtFacts<SetFact<VarId>>>,
) -> BTreeSet<StmtId> {
    let Some(cfg) = method.cfg() else {
        return BTreeSet::new();
    };

    let mut dead = unreachable_code(method, const_prop);
    for (stmt_id, stmt) in cfg.nodes() {
        if let StmtKind::Assign { dst, expr } = stmt {
            let Some(out) = live_vars.get(&stmt_id) else {
                continue;
            };
            if expr.is_side_effect_free() && !out.out.contains(dst) {
                dead.insert(stmt_id);
            }
        }
    }
    let exits: BTreeSet<StmtId> = cfg.exits().collect();
    dead.retain(|s| !exits.contains(s));
    dead
}

/// Breadth-first traversal from the CFG entry, following only the edges a
/// statically-known `If`/`Switch` condition selects; every node never
/// reached this way is unreachable.
fn unreachable_code(
    method: &Method,
    const_prop: &std::collections::BTreeMap<StmtId, StmtFacts<CPFact>>,
) -> BTreeSet<StmtId> {
    let cfg = method.cfg().expect("caller checked for a body");
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([cfg.entry_point()]);
    while let Some(stmt_id) = queue.pop_front() {
        if !visited.insert(stmt_id) {
            continue;
        }
        let stmt = cfg.node(stmt_id).expect("node exists");
        let edges: Vec<(StmtId, CfgEdge)> = cfg
            .edges_from(stmt_id)
            .map(|(dst, edge)| (dst, edge.clone()))
            .collect();
        let successors: Vec<StmtId> = match stmt {
            StmtKind::If { cond } => {
                let fact = &const_prop[&stmt_id].out;
                let value = evaluate(cond, fact);
                branch_successors(edges, &value, true)
            }
            StmtKind::Switch { value } => {
                let fact = &const_prop[&stmt_id].out;
                let evaluated = evaluate(value, fact);
                branch_successors(edges, &evaluated, false)
            }
            _ => edges.into_iter().map(|(dst, _)| dst).collect(),
        };
        queue.extend(successors);
    }
    cfg.nodes()
        .map(|(id, _)| id)
        .filter(|id| !visited.contains(id))
        .collect()
}

/// `§4.H` edge-selection rule, shared between `If` (boolean, `is_if =
/// true`) and `Switch` (`is_if = false`).
fn branch_successors(edges: Vec<(StmtId, CfgEdge)>, value: &Value, is_if: bool) -> Vec<StmtId> {
    match value.as_const() {
        Some(c) if is_if => {
            let want = if c != 0 { CfgEdge::IfTrue } else { CfgEdge::IfFalse };
            edges
                .into_iter()
                .filter(|(_, e)| *e == want)
                .map(|(dst, _)| dst)
                .collect()
        }
        Some(c) => {
            let matched: Vec<StmtId> = edges
                .iter()
                .filter(|(_, e)| matches!(e, CfgEdge::Case(v) if *v == c))
                .map(|(dst, _)| *dst)
                .collect();
            if matched.is_empty() {
                edges
                    .into_iter()
                    .filter(|(_, e)| matches!(e, CfgEdge::SwitchDefault))
                    .map(|(dst, _)| dst)
                    .collect()
            } else {
                matched
            }
        }
        None => edges.into_iter().map(|(dst, _)| dst).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataflow::{self, const_prop::ConstantPropagation, live_vars::LiveVariables},
        ir::{
            BinOp, ClassId, Expr, MethodBuilder, ProgramBuilder, RValue, Subsignature, Type,
            types::PrimitiveType,
        },
    };

    fn int_ty() -> Type {
        Type::Primitive(PrimitiveType::Int)
    }

    /// S2: `int x=2,y; switch(x+1){case 1:y=100; break; case 2:y=200;
    /// case 3:y=300; break; default:y=666;} return y;`
    ///
    /// `x+1` evaluates to `CONST(3)`; the only followed edge out of the
    /// switch is `case 3`, so `case 1`'s `y=100` (and its `break`), `case
    /// 2`'s `y=200`, and `default`'s `y=666` are all unreachable.
    fn scenario_s2() -> (crate::ir::Method, StmtId, StmtId, StmtId, StmtId, StmtId) {
        let mut mb = MethodBuilder::new(Subsignature::new("m()"), true);
        let x = mb.var("x", int_ty());
        let y = mb.var("y", int_ty());

        // 0: x = 2
        mb.stmt(
            StmtId(0),
            StmtKind::Assign { dst: x, expr: Expr::Value(RValue::IntLiteral(2)) },
        );
        // 1: switch(x+1)
        mb.stmt(
            StmtId(1),
            StmtKind::Switch {
                value: RValue::binary(BinOp::Add, RValue::Var(x), RValue::IntLiteral(1)),
            },
        );
        // 2: case 1: y = 100
        let case1 = StmtId(2);
        mb.stmt(case1, StmtKind::Assign { dst: y, expr: Expr::Value(RValue::IntLiteral(100)) });
        // 3: break -> return
        let brk1 = StmtId(3);
        mb.stmt(brk1, StmtKind::Nop);
        // 4: case 2: y = 200 (falls through to case 3)
        let case2 = StmtId(4);
        mb.stmt(case2, StmtKind::Assign { dst: y, expr: Expr::Value(RValue::IntLiteral(200)) });
        // 5: case 3: y = 300
        let case3 = StmtId(5);
        mb.stmt(case3, StmtKind::Assign { dst: y, expr: Expr::Value(RValue::IntLiteral(300)) });
        // 6: break -> return
        let brk3 = StmtId(6);
        mb.stmt(brk3, StmtKind::Nop);
        // 7: default: y = 666
        let default = StmtId(7);
        mb.stmt(default, StmtKind::Assign { dst: y, expr: Expr::Value(RValue::IntLiteral(666)) });
        // 8: break -> return
        let brk_default = StmtId(8);
        mb.stmt(brk_default, StmtKind::Nop);
        // 9: return y
        let ret = StmtId(9);
        mb.stmt(ret, StmtKind::Return(Some(y)));

        mb.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        mb.edge(StmtId(1), case1, CfgEdge::Case(1));
        mb.edge(StmtId(1), case2, CfgEdge::Case(2));
        mb.edge(StmtId(1), case3, CfgEdge::Case(3));
        mb.edge(StmtId(1), default, CfgEdge::SwitchDefault);
        mb.edge(case1, brk1, CfgEdge::Normal);
        mb.edge(brk1, ret, CfgEdge::Normal);
        // case 2 falls through into case 3's body via a plain edge, distinct
        // from the `Case(3)` edge the switch itself exposes (`§9` open
        // question 5).
        mb.edge(case2, case3, CfgEdge::Normal);
        mb.edge(case3, brk3, CfgEdge::Normal);
        mb.edge(brk3, ret, CfgEdge::Normal);
        mb.edge(default, brk_default, CfgEdge::Normal);
        mb.edge(brk_default, ret, CfgEdge::Normal);

        let mut pb = ProgramBuilder::new();
        pb.class("Main", false, None, vec![]);
        pb.method(&ClassId::from("Main"), mb);
        let program = pb.build();
        let method = program
            .class(&ClassId::from("Main"))
            .unwrap()
            .methods
            .values()
            .next()
            .unwrap()
            .clone();
        (method, case1, brk1, case2, default, ret)
    }

    #[test]
    fn s2_dead_switch_branches() {
        let (method, case1, brk1, _case2, default, _ret) = scenario_s2();
        let cp = dataflow::solve(&ConstantPropagation::new(&method), &method);
        let lv = dataflow::solve(&LiveVariables, &method);
        let dead = detect(&method, &cp, &lv);

        assert!(dead.contains(&case1), "case 1 is unreachable under CONST(3)");
        assert!(dead.contains(&brk1), "case 1's break is unreachable too");
        assert!(dead.contains(&default), "default is unreachable once case 3 matches");
    }

    #[test]
    fn cfg_exit_is_never_reported_dead() {
        let mut mb = MethodBuilder::new(Subsignature::new("m()"), true);
        let x = mb.var("x", int_ty());
        mb.stmt(StmtId(0), StmtKind::Assign { dst: x, expr: Expr::Value(RValue::IntLiteral(1)) });
        mb.stmt(
            StmtId(1),
            StmtKind::If { cond: RValue::binary(BinOp::Eq, RValue::Var(x), RValue::IntLiteral(1)) },
        );
        mb.stmt(StmtId(2), StmtKind::Return(None));
        mb.stmt(StmtId(3), StmtKind::Return(None));
        mb.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        mb.edge(StmtId(1), StmtId(2), CfgEdge::IfTrue);
        mb.edge(StmtId(1), StmtId(3), CfgEdge::IfFalse);
        let mut pb = ProgramBuilder::new();
        pb.class("Main", false, None, vec![]);
        pb.method(&ClassId::from("Main"), mb);
        let program = pb.build();
        let method = program
            .class(&ClassId::from("Main"))
            .unwrap()
            .methods
            .values()
            .next()
            .unwrap()
            .clone();

        let cp = dataflow::solve(&ConstantPropagation::new(&method), &method);
        let lv = dataflow::solve(&LiveVariables, &method);
        let dead = detect(&method, &cp, &lv);
        // stmt 3 is unreachable (x is always 1) but it is a CFG exit, so
        // it must not appear in the reported set.
        assert!(!dead.contains(&StmtId(3)));
    }

    #[test]
    fn dead_assignment_excludes_side_effecting_rhs() {
        let mut mb = MethodBuilder::new(Subsignature::new("m()"), true);
        let x = mb.var("x", int_ty());
        let c = mb.var("c", Type::Class(ClassId::from("C")));
        mb.stmt(StmtId(0), StmtKind::Assign { dst: x, expr: Expr::Value(RValue::IntLiteral(0)) });
        mb.stmt(StmtId(1), StmtKind::Assign { dst: c, expr: Expr::New(ClassId::from("C")) });
        mb.stmt(StmtId(2), StmtKind::Return(None));
        mb.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        mb.edge(StmtId(1), StmtId(2), CfgEdge::Normal);
        let mut pb = ProgramBuilder::new();
        pb.class("C", false, None, vec![]);
        pb.class("Main", false, None, vec![]);
        pb.method(&ClassId::from("Main"), mb);
        let program = pb.build();
        let method = program
            .class(&ClassId::from("Main"))
            .unwrap()
            .methods
            .values()
            .next()
            .unwrap()
            .clone();

        let cp = dataflow::solve(&ConstantPropagation::new(&method), &method);
        let lv = dataflow::solve(&LiveVariables, &method);
        let dead = detect(&method, &cp, &lv);
        // `x` is dead (never used again) but `c` is a `New` and must not
        // be reported even though `c` is equally dead.
        assert!(dead.contains(&StmtId(0)));
        assert!(!dead.contains(&StmtId(1)));
    }
}

//! `§4.A` `evaluate` and `§4.C.2` -- forward intraprocedural constant
//! propagation over the three-valued lattice.

use crate::{
    ir::{Expr, Method, RValue, StmtId, StmtKind},
    lattice::{CPFact, MeetSemilattice, Value},
};

use super::{DataflowAnalysis, Direction};

/// `evaluate(exp, in)` restricted to the operands constant propagation
/// reasons about directly: variables, literals, and binary expressions.
/// Field and array loads are not `RValue`s -- the intraprocedural analysis
/// treats them as `NAC` at the `Expr` level, see [`evaluate_expr`].
#[must_use]
pub fn evaluate(rvalue: &RValue, fact: &CPFact) -> Value {
    match rvalue {
        RValue::Var(v) => fact.get(*v),
        RValue::IntLiteral(c) => Value::Const(*c),
        RValue::Binary(op, lhs, rhs) => {
            let a = evaluate(lhs, fact);
            let b = evaluate(rhs, fact);
            evaluate_binary(*op, a, b)
        }
    }
}

/// The binary-operator evaluation rule from `§4.A`: any `NAC` yields
/// `NAC` except that concrete division/remainder by zero always yields
/// `UNDEF`, even when the dividend is `NAC` (the spec's documented choice
/// for the division-by-zero ambiguity, see `DESIGN.md`).
#[must_use]
pub fn evaluate_binary(op: crate::ir::BinOp, a: Value, b: Value) -> Value {
    if op.is_division_like() && b == Value::Const(0) {
        return Value::Undef;
    }
    match (a, b) {
        (Value::Const(a), Value::Const(b)) => op
            .apply(a, b)
            .map_or(Value::Undef, Value::Const),
        (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
        _ => Value::Undef,
    }
}

/// `evaluate` lifted to the broader `Expr` the IR actually assigns: a
/// plain `RValue`, or a field/array load which the intraprocedural
/// analysis cannot reason about and so treats as `NAC`.
#[must_use]
pub fn evaluate_expr(expr: &Expr, fact: &CPFact) -> Value {
    match expr {
        Expr::Value(rv) => evaluate(rv, fact),
        Expr::New(_) | Expr::LoadField { .. } | Expr::LoadArray { .. } | Expr::Cast { .. } => {
            Value::Nac
        }
    }
}

/// Forward constant propagation: `§4.C.2`. Borrows the owning method so
/// the transfer function can check `canHoldInt` on the assigned variable.
#[derive(Debug)]
pub struct ConstantPropagation<'m> {
    method: &'m Method,
}

impl<'m> ConstantPropagation<'m> {
    #[must_use]
    pub fn new(method: &'m Method) -> Self {
        Self { method }
    }
}

impl DataflowAnalysis for ConstantPropagation<'_> {
    type Fact = CPFact;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn boundary_fact(&self, method: &Method) -> Self::Fact {
        let mut fact = CPFact::new();
        for &param in &method.params {
            if method.var_type(param).can_hold_int() {
                fact.set(param, Value::Nac);
            }
        }
        fact
    }

    fn transfer(&self, _stmt_id: StmtId, stmt: &StmtKind, inn: &Self::Fact) -> Self::Fact {
        let mut out = inn.clone();
        if let StmtKind::Assign { dst, expr } = stmt {
            if self.method.var_type(*dst).can_hold_int() {
                out.set(*dst, evaluate_expr(expr, inn));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataflow::solve,
        ir::{BinOp, ClassId, MethodBuilder, ProgramBuilder, Subsignature, Type, VarId, types::PrimitiveType},
    };
    use pretty_assertions::assert_eq;

    fn int_ty() -> Type {
        Type::Primitive(PrimitiveType::Int)
    }

    /// S1: `x = 2; y = x + 3; z = x * y;`
    fn scenario_s1() -> (crate::ir::Method, VarId, VarId, VarId) {
        let mut mb = MethodBuilder::new(Subsignature::new("m()"), true);
        let x = mb.var("x", int_ty());
        let y = mb.var("y", int_ty());
        let z = mb.var("z", int_ty());
        mb.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: x,
                expr: Expr::Value(RValue::IntLiteral(2)),
            },
        );
        mb.stmt(
            StmtId(1),
            StmtKind::Assign {
                dst: y,
                expr: Expr::Value(RValue::binary(BinOp::Add, RValue::Var(x), RValue::IntLiteral(3))),
            },
        );
        mb.stmt(
            StmtId(2),
            StmtKind::Assign {
                dst: z,
                expr: Expr::Value(RValue::binary(BinOp::Mul, RValue::Var(x), RValue::Var(y))),
            },
        );
        mb.edge(StmtId(0), StmtId(1), crate::ir::CfgEdge::Normal);
        mb.edge(StmtId(1), StmtId(2), crate::ir::CfgEdge::Normal);
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
        (method, x, y, z)
    }

    #[test]
    fn s1_constant_propagation() {
        let (method, x, y, z) = scenario_s1();
        let facts = solve(&ConstantPropagation::new(&method), &method);
        let out = &facts[&StmtId(2)].out;
        assert_eq!(out.get(x), Value::Const(2));
        assert_eq!(out.get(y), Value::Const(5));
        assert_eq!(out.get(z), Value::Const(10));
    }

    #[test]
    fn division_by_concrete_zero_is_undef_even_with_nac_dividend() {
        let v = evaluate_binary(BinOp::Div, Value::Nac, Value::Const(0));
        assert_eq!(v, Value::Undef);
    }

    #[test]
    fn division_by_nac_is_nac() {
        let v = evaluate_binary(BinOp::Div, Value::Const(4), Value::Nac);
        assert_eq!(v, Value::Nac);
    }

    /// `i32::MIN / -1` and `i32::MIN % -1` overflow two's-complement
    /// negation but are not division by zero: 32-bit semantics wrap them
    /// to `MIN` and `0` respectively rather than yielding `UNDEF`.
    #[test]
    fn min_divided_by_negative_one_wraps_instead_of_going_undef() {
        let div = evaluate_binary(BinOp::Div, Value::Const(i32::MIN), Value::Const(-1));
        assert_eq!(div, Value::Const(i32::MIN));
        let rem = evaluate_binary(BinOp::Rem, Value::Const(i32::MIN), Value::Const(-1));
        assert_eq!(rem, Value::Const(0));
    }
}

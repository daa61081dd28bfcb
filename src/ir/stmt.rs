//! Statement kinds: the sum type the whole core dispatches on.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    rvalue::RValue,
    types::{ClassId, FieldRef, MethodRef},
    var::VarId,
};

/// Whether a field access is through an instance or is a static field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldBase {
    Instance(VarId),
    Static,
}

/// The kind of dispatch used at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Static => "static",
            Self::Special => "special",
            Self::Virtual => "virtual",
            Self::Interface => "interface",
        };
        write!(f, "{name}")
    }
}

/// An invocation: the callee reference as named at the call site, the
/// receiver (absent for static calls), the argument list, and the
/// optional lvalue the result is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoke {
    pub kind: CallKind,
    pub method: MethodRef,
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
    pub dst: Option<VarId>,
}

/// The right-hand side of an [`StmtKind::Assign`]. Subsumes `New`, `Copy`,
/// `LoadField` and `LoadArray` from the statement-kind list in the data
/// model: each is a case of "assign an lvalue from an expression".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// A plain arithmetic/copy value: `x = y`, `x = 3`, `x = y + z`.
    Value(RValue),
    /// `x = new C`.
    New(ClassId),
    /// `x = base.f` or `x = C.f`.
    LoadField { base: FieldBase, field: FieldRef },
    /// `x = a[i]`.
    LoadArray { array: VarId, index: RValue },
    /// `x = (T) y`.
    Cast { ty: crate::ir::types::Type, operand: VarId },
}

impl Expr {
    /// Whether evaluating this expression and discarding the result has no
    /// observable effect, i.e. it is safe to delete an assignment whose
    /// lvalue is dead. `New`, field/array loads and casts are excluded
    /// because they may trigger allocation, an implicit null check, or a
    /// `ClassCastException` respectively; division/remainder are excluded
    /// because they may trap.
    #[must_use]
    pub fn is_side_effect_free(&self) -> bool {
        match self {
            Self::Value(RValue::Binary(op, ..)) => !op.is_division_like(),
            Self::Value(_) => true,
            Self::New(_) | Self::LoadField { .. } | Self::LoadArray { .. } | Self::Cast { .. } => {
                false
            }
        }
    }

    /// Every variable this expression reads.
    pub fn used_vars(&self) -> Vec<VarId> {
        match self {
            Self::Value(rv) => rv.used_vars(),
            Self::New(_) => vec![],
            Self::LoadField { base, .. } => match base {
                FieldBase::Instance(v) => vec![*v],
                FieldBase::Static => vec![],
            },
            Self::LoadArray { array, index } => {
                let mut vars = vec![*array];
                vars.extend(index.used_vars());
                vars
            }
            Self::Cast { operand, .. } => vec![*operand],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(rv) => write!(f, "{rv}"),
            Self::New(c) => write!(f, "new {c}"),
            Self::LoadField {
                base: FieldBase::Instance(v),
                field,
            } => write!(f, "{v}.{}", field.name),
            Self::LoadField {
                base: FieldBase::Static,
                field,
            } => write!(f, "{field}"),
            Self::LoadArray { array, index } => write!(f, "{array}[{index}]"),
            Self::Cast { ty, operand } => write!(f, "({ty}) {operand}"),
        }
    }
}

/// A single statement. Every statement kind the data model requires is a
/// variant here; match is exhaustive, no visitor double-dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `dst = expr` -- covers `New`, `Copy`, `LoadField`, `LoadArray` and
    /// plain arithmetic assignment.
    Assign { dst: VarId, expr: Expr },
    /// `base.f = src` or `C.f = src`.
    StoreField {
        base: FieldBase,
        field: FieldRef,
        src: VarId,
    },
    /// `array[index] = src`.
    StoreArray {
        array: VarId,
        index: RValue,
        src: VarId,
    },
    /// A call, static/special/virtual/interface.
    Invoke(Invoke),
    /// A conditional branch; the taken edge is encoded in the CFG, not here.
    If { cond: RValue },
    /// A multi-way branch; case values are encoded as CFG edges.
    Switch { value: RValue },
    /// `return expr;` or `return;`.
    Return(Option<VarId>),
    /// A statement with no analysis-visible effect (e.g. a label or goto
    /// whose target is fully described by the CFG edge).
    Nop,
}

impl StmtKind {
    /// The variable this statement defines, if any.
    #[must_use]
    pub fn defines(&self) -> Option<VarId> {
        match self {
            Self::Assign { dst, .. } => Some(*dst),
            Self::Invoke(inv) => inv.dst,
            Self::StoreField { .. }
            | Self::StoreArray { .. }
            | Self::If { .. }
            | Self::Switch { .. }
            | Self::Return(_)
            | Self::Nop => None,
        }
    }

    /// Every variable this statement reads.
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Self::Assign { expr, .. } => expr.used_vars(),
            Self::StoreField { base, src, .. } => {
                let mut vars = match base {
                    FieldBase::Instance(v) => vec![*v],
                    FieldBase::Static => vec![],
                };
                vars.push(*src);
                vars
            }
            Self::StoreArray { array, index, src } => {
                let mut vars = vec![*array];
                vars.extend(index.used_vars());
                vars.push(*src);
                vars
            }
            Self::Invoke(inv) => {
                let mut vars: Vec<VarId> = inv.receiver.into_iter().collect();
                vars.extend(inv.args.iter().copied());
                vars
            }
            Self::If { cond } | Self::Switch { value: cond } => cond.used_vars(),
            Self::Return(Some(v)) => vec![*v],
            Self::Return(None) | Self::Nop => vec![],
        }
    }

    /// Whether this is an [`Invoke`] statement, and a reference to it.
    #[must_use]
    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Self::Invoke(inv) => Some(inv),
            _ => None,
        }
    }
}

impl fmt::Display for StmtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { dst, expr } => write!(f, "{dst} = {expr}"),
            Self::StoreField {
                base: FieldBase::Instance(v),
                field,
                src,
            } => write!(f, "{v}.{} = {src}", field.name),
            Self::StoreField {
                base: FieldBase::Static,
                field,
                src,
            } => write!(f, "{field} = {src}"),
            Self::StoreArray { array, index, src } => write!(f, "{array}[{index}] = {src}"),
            Self::Invoke(inv) => {
                if let Some(dst) = inv.dst {
                    write!(f, "{dst} = ")?;
                }
                if let Some(recv) = inv.receiver {
                    write!(f, "{recv}.")?;
                }
                write!(
                    f,
                    "{}({})",
                    inv.method,
                    inv.args
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Self::If { cond } => write!(f, "if {cond}"),
            Self::Switch { value } => write!(f, "switch {value}"),
            Self::Return(Some(v)) => write!(f, "return {v}"),
            Self::Return(None) => write!(f, "return"),
            Self::Nop => write!(f, "nop"),
        }
    }
}

//! Arithmetic-evaluable right-hand-side values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::var::VarId;

/// The integer binary operators constant propagation must evaluate.
/// 32-bit two's-complement semantics; `UShr` is the logical (unsigned)
/// right shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    Xor,
}

impl BinOp {
    /// Whether this operator can divide by its second operand.
    #[must_use]
    pub const fn is_division_like(self) -> bool {
        matches!(self, Self::Div | Self::Rem)
    }

    /// Evaluates the operator over two concrete 32-bit operands. Returns
    /// `None` only for division or remainder by zero; a non-zero divisor
    /// always produces a result, wrapping on the `i32::MIN / -1` overflow
    /// per 32-bit two's-complement semantics (`MIN / -1` wraps to `MIN`,
    /// `MIN % -1` is `0`, neither is an exception under JLS §15.17.2).
    #[must_use]
    pub fn apply(self, a: i32, b: i32) -> Option<i32> {
        let bool_to_i32 = |b: bool| i32::from(b);
        match self {
            Self::Add => Some(a.wrapping_add(b)),
            Self::Sub => Some(a.wrapping_sub(b)),
            Self::Mul => Some(a.wrapping_mul(b)),
            Self::Div => (b != 0).then(|| a.wrapping_div(b)),
            Self::Rem => (b != 0).then(|| a.wrapping_rem(b)),
            Self::Eq => Some(bool_to_i32(a == b)),
            Self::Ne => Some(bool_to_i32(a != b)),
            Self::Lt => Some(bool_to_i32(a < b)),
            Self::Gt => Some(bool_to_i32(a > b)),
            Self::Le => Some(bool_to_i32(a <= b)),
            Self::Ge => Some(bool_to_i32(a >= b)),
            Self::Shl => Some(a.wrapping_shl(b as u32 & 0x1f)),
            Self::Shr => Some(a.wrapping_shr(b as u32 & 0x1f)),
            Self::UShr => Some(((a as u32).wrapping_shr(b as u32 & 0x1f)) as i32),
            Self::And => Some(a & b),
            Self::Or => Some(a | b),
            Self::Xor => Some(a ^ b),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        };
        write!(f, "{sym}")
    }
}

/// The operands `evaluate` works over: a variable reference, an integer
/// literal, or a binary expression over two more [`RValue`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RValue {
    Var(VarId),
    IntLiteral(i32),
    Binary(BinOp, Box<RValue>, Box<RValue>),
}

impl RValue {
    /// Builds a binary expression, boxing its operands.
    #[must_use]
    pub fn binary(op: BinOp, lhs: RValue, rhs: RValue) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Returns every variable read by this expression.
    pub fn used_vars(&self) -> Vec<VarId> {
        match self {
            Self::Var(v) => vec![*v],
            Self::IntLiteral(_) => vec![],
            Self::Binary(_, lhs, rhs) => {
                let mut vars = lhs.used_vars();
                vars.extend(rhs.used_vars());
                vars
            }
        }
    }
}

impl fmt::Display for RValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(v) => write!(f, "{v}"),
            Self::IntLiteral(c) => write!(f, "{c}"),
            Self::Binary(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
        }
    }
}

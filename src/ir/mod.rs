//! The intermediate representation: types, variables, statements, the
//! control-flow graph and the whole-program container.

pub mod cfg;
pub mod method;
pub mod program;
pub mod rvalue;
pub mod stmt;
pub mod types;
pub mod var;

pub use cfg::{CfgEdge, ControlFlowGraph, StmtId};
pub use method::Method;
pub use program::{Class, MethodBuilder, Program, ProgramBuilder};
pub use rvalue::{BinOp, RValue};
pub use stmt::{CallKind, Expr, FieldBase, Invoke, StmtKind};
pub use types::{ClassId, FieldRef, MethodId, MethodRef, PrimitiveType, Subsignature, Type};
pub use var::{VarId, VarInfo};

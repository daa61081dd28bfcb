//! A method body: a control-flow graph of statements plus its variable
//! table and signature.

use serde::{Deserialize, Serialize};

use super::{
    cfg::{CfgEdge, ControlFlowGraph, StmtId},
    stmt::{FieldBase, Invoke, StmtKind},
    types::{MethodId, Type},
    var::{VarId, VarInfo},
};

/// A declared method. `cfg` is absent (`None`) for abstract methods and
/// interface method declarations, which have no body to analyze.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub is_static: bool,
    pub is_abstract: bool,
    /// `vars[0..params.len()]` are the formal parameters in order; the
    /// `this` variable, when present, is `vars[0]` and is not counted in
    /// `params`.
    pub vars: Vec<VarInfo>,
    pub this_var: Option<VarId>,
    pub params: Vec<VarId>,
    pub cfg: Option<ControlFlowGraph<StmtKind, CfgEdge>>,
}

impl Method {
    /// The static type of a variable.
    #[must_use]
    pub fn var_type(&self, v: VarId) -> &Type {
        &self.vars[v.0 as usize].ty
    }

    /// The control-flow graph, for methods with a body.
    #[must_use]
    pub fn cfg(&self) -> Option<&ControlFlowGraph<StmtKind, CfgEdge>> {
        self.cfg.as_ref()
    }

    /// Every `Invoke` statement in this method, with its location.
    pub fn invoke_sites(&self) -> impl Iterator<Item = (StmtId, &Invoke)> {
        self.cfg.iter().flat_map(|cfg| {
            cfg.nodes()
                .filter_map(|(id, stmt)| stmt.as_invoke().map(|inv| (id, inv)))
        })
    }

    /// Every statement that stores into an instance or static field on `v`
    /// (for instance stores) or any static store of the given kind.
    pub fn store_fields_on(&self, v: VarId) -> impl Iterator<Item = (StmtId, &StmtKind)> {
        self.cfg.iter().flat_map(move |cfg| {
            cfg.nodes().filter(move |(_, stmt)| {
                matches!(
                    stmt,
                    StmtKind::StoreField { base: FieldBase::Instance(base), .. } if *base == v
                )
            })
        })
    }

    /// Every statement that loads an instance field from `v`.
    pub fn load_fields_on(&self, v: VarId) -> impl Iterator<Item = (StmtId, &StmtKind)> {
        self.cfg.iter().flat_map(move |cfg| {
            cfg.nodes().filter(move |(_, stmt)| {
                matches!(
                    stmt,
                    StmtKind::Assign {
                        expr: super::stmt::Expr::LoadField { base: FieldBase::Instance(base), .. },
                        ..
                    } if *base == v
                )
            })
        })
    }

    /// Every statement that stores into `v[_]`.
    pub fn store_arrays_on(&self, v: VarId) -> impl Iterator<Item = (StmtId, &StmtKind)> {
        self.cfg.iter().flat_map(move |cfg| {
            cfg.nodes().filter(move |(_, stmt)| {
                matches!(stmt, StmtKind::StoreArray { array, .. } if *array == v)
            })
        })
    }

    /// Every statement that loads from `v[_]`.
    pub fn load_arrays_on(&self, v: VarId) -> impl Iterator<Item = (StmtId, &StmtKind)> {
        self.cfg.iter().flat_map(move |cfg| {
            cfg.nodes().filter(move |(_, stmt)| {
                matches!(
                    stmt,
                    StmtKind::Assign { expr: super::stmt::Expr::LoadArray { array, .. }, .. }
                        if *array == v
                )
            })
        })
    }

    /// Every `Invoke` statement where `v` is the receiver.
    pub fn invokes_on_receiver(&self, v: VarId) -> impl Iterator<Item = (StmtId, &Invoke)> {
        self.invoke_sites()
            .filter(move |(_, inv)| inv.receiver == Some(v))
    }

    /// The variables returned across every `Return` statement in this
    /// method (used by the inter-procedural `Return` edge transfer).
    pub fn return_vars(&self) -> Vec<VarId> {
        self.cfg
            .iter()
            .flat_map(|cfg| cfg.nodes())
            .filter_map(|(_, stmt)| match stmt {
                StmtKind::Return(Some(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }
}

//! The whole-program IR: classes, their methods, and a builder API.
//!
//! There is no parser here -- callers (tests, the CLI, embedding code)
//! construct a [`Program`] directly with [`ProgramBuilder`], or load one
//! that was serialized to JSON by another tool via `serde`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    cfg::{CfgEdge, ControlFlowGraph, StmtId},
    method::Method,
    stmt::StmtKind,
    types::{ClassId, FieldRef, MethodId, Subsignature, Type},
    var::{VarId, VarInfo},
};

/// A class or interface declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub is_interface: bool,
    pub super_class: Option<ClassId>,
    /// Interfaces this class implements, or -- when `self` is an interface
    /// -- interfaces it extends.
    pub interfaces: Vec<ClassId>,
    pub fields: Vec<FieldRef>,
    pub methods: BTreeMap<Subsignature, Method>,
}

impl Class {
    /// A method declared directly on this class (not inherited).
    #[must_use]
    pub fn declared_method(&self, sig: &Subsignature) -> Option<&Method> {
        self.methods.get(sig)
    }
}

/// A whole program: every class reachable from the analysis entry point,
/// plus whatever else was loaded alongside it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub classes: BTreeMap<ClassId, Class>,
}

impl Program {
    /// Looks up a class by id.
    #[must_use]
    pub fn class(&self, id: &ClassId) -> Option<&Class> {
        self.classes.get(id)
    }

    /// Looks up a concrete method by its identity (declaring class +
    /// subsignature).
    #[must_use]
    pub fn method(&self, id: &MethodId) -> Option<&Method> {
        self.classes
            .get(&id.declaring_class)
            .and_then(|c| c.methods.get(&id.subsignature))
    }
}

/// Incrementally assembles a [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a class or interface. `super_class`/`interfaces` follow the
    /// rules in [`Class`].
    pub fn class(
        &mut self,
        id: impl Into<ClassId>,
        is_interface: bool,
        super_class: Option<ClassId>,
        interfaces: Vec<ClassId>,
    ) -> &mut Self {
        let id = id.into();
        self.program.classes.entry(id.clone()).or_insert(Class {
            id,
            is_interface,
            super_class,
            interfaces,
            fields: Vec::new(),
            methods: BTreeMap::new(),
        });
        self
    }

    /// Adds a field declaration to an already-declared class.
    ///
    /// # Panics
    /// Panics if `class` was not declared with [`Self::class`] first.
    pub fn field(&mut self, class: &ClassId, field: FieldRef) -> &mut Self {
        self.program
            .classes
            .get_mut(class)
            .expect("class not declared")
            .fields
            .push(field);
        self
    }

    /// Adds a method to an already-declared class via a [`MethodBuilder`].
    ///
    /// # Panics
    /// Panics if `class` was not declared with [`Self::class`] first.
    pub fn method(&mut self, class: &ClassId, builder: MethodBuilder) -> &mut Self {
        let method = builder.build(class.clone());
        self.program
            .classes
            .get_mut(class)
            .expect("class not declared")
            .methods
            .insert(method.id.subsignature.clone(), method);
        self
    }

    /// Consumes the builder, returning the assembled program.
    #[must_use]
    pub fn build(self) -> Program {
        self.program
    }
}

/// Incrementally assembles a [`Method`]: its variables, then its
/// statements and the control-flow edges between them.
#[derive(Debug)]
pub struct MethodBuilder {
    subsignature: Subsignature,
    is_static: bool,
    is_abstract: bool,
    vars: Vec<VarInfo>,
    this_var: Option<VarId>,
    params: Vec<VarId>,
    nodes: Vec<(StmtId, StmtKind)>,
    edges: Vec<(StmtId, StmtId, CfgEdge)>,
}

impl MethodBuilder {
    #[must_use]
    pub fn new(subsignature: Subsignature, is_static: bool) -> Self {
        Self {
            subsignature,
            is_static,
            is_abstract: false,
            vars: Vec::new(),
            this_var: None,
            params: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Marks this method abstract (no body; `build` produces `cfg: None`).
    #[must_use]
    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declares the `this` variable of an instance method. Must be called
    /// before any [`Self::var`]/[`Self::param`] calls that should come
    /// after it in the variable table, since `this` is conventionally
    /// `vars[0]`.
    #[must_use]
    pub fn this(mut self, ty: Type) -> Self {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: "this".to_owned(),
            ty,
        });
        self.this_var = Some(id);
        self
    }

    /// Declares a formal parameter, returning its [`VarId`].
    pub fn param(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        let id = self.var(name, ty);
        self.params.push(id);
        id
    }

    /// Declares a local variable (or parameter, via [`Self::param`]),
    /// returning its [`VarId`].
    pub fn var(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: name.into(),
            ty,
        });
        id
    }

    /// Appends a statement at the given location.
    pub fn stmt(&mut self, id: StmtId, kind: StmtKind) -> &mut Self {
        self.nodes.push((id, kind));
        self
    }

    /// Appends a control-flow edge.
    pub fn edge(&mut self, src: StmtId, dst: StmtId, edge: CfgEdge) -> &mut Self {
        self.edges.push((src, dst, edge));
        self
    }

    fn build(self, declaring_class: ClassId) -> Method {
        let cfg = if self.is_abstract {
            None
        } else {
            Some(ControlFlowGraph::build(self.nodes, self.edges))
        };
        Method {
            id: MethodId {
                declaring_class,
                subsignature: self.subsignature,
            },
            is_static: self.is_static,
            is_abstract: self.is_abstract,
            vars: self.vars,
            this_var: self.this_var,
            params: self.params,
            cfg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::PrimitiveType;

    #[test]
    fn builds_a_trivial_program() {
        let mut pb = ProgramBuilder::new();
        pb.class("Main", false, None, vec![]);
        let mut mb = MethodBuilder::new(Subsignature::new("main()"), true);
        let x = mb.var("x", Type::Primitive(PrimitiveType::Int));
        mb.stmt(
            StmtId(0),
            StmtKind::Assign {
                dst: x,
                expr: super::super::stmt::Expr::Value(super::super::rvalue::RValue::IntLiteral(1)),
            },
        );
        mb.stmt(StmtId(1), StmtKind::Return(None));
        mb.edge(StmtId(0), StmtId(1), CfgEdge::Normal);
        pb.method(&ClassId::from("Main"), mb);
        let program = pb.build();
        let class = program.class(&ClassId::from("Main")).unwrap();
        assert_eq!(class.methods.len(), 1);
    }
}

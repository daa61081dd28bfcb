//! The context abstraction for the context-sensitive pointer analysis
//! (`§4.E`): a [`Context`] is an opaque label over calling/allocation
//! history; [`ContextSelector`] is the collaborator `§6` names.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::heap::Obj;
use crate::ir::MethodId;

pub use crate::cha::CallSite as CallSiteId;

/// One label in a k-call-site-sensitive context: the call site that
/// pushed this frame.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallLabel(pub CallSiteId<MethodId>);

/// An abstraction of calling/allocation history: a bounded stack of
/// call-site labels. Equality and ordering are structural, so the
/// k-limiting in [`KCallSiteSensitivity`] is just a truncation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Context(pub Vec<CallLabel>);

impl Context {
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, l) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}@{}", l.0.caller, l.0.stmt)?;
        }
        write!(f, "]")
    }
}

/// A method paired with the context it was analyzed under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CsMethod {
    pub ctx: Context,
    pub method: MethodId,
}

impl fmt::Display for CsMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.ctx, self.method)
    }
}

/// A heap object paired with the heap context it was allocated under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CsObj {
    pub ctx: Context,
    pub obj: Obj,
}

impl fmt::Display for CsObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.ctx, self.obj)
    }
}

/// The `ContextSelector` collaborator `§4.E`/`§6`: how call-site and
/// heap contexts are derived during on-the-fly call-graph construction.
pub trait ContextSelector {
    fn empty_context(&self) -> Context;

    /// Selects the callee context for a static call (no receiver object).
    fn select_context(
        &self,
        caller_ctx: &Context,
        call_site: &CallSiteId<MethodId>,
        callee: &MethodId,
    ) -> Context;

    /// Selects the callee context for an instance call, given the
    /// receiver's heap-context-tagged object.
    fn select_context_with_recv(
        &self,
        caller_ctx: &Context,
        call_site: &CallSiteId<MethodId>,
        recv_obj: &CsObj,
        callee: &MethodId,
    ) -> Context;

    /// Selects the heap context for an object allocated by `cs_method`.
    fn select_heap_context(&self, cs_method: &CsMethod, obj: &Obj) -> Context;
}

/// k-call-site sensitivity: the context is the last `k` call sites on the
/// calling stack; heap contexts mirror the allocating method's own
/// running context, the common Tai-e/Soot default.
#[derive(Debug, Clone, Copy)]
pub struct KCallSiteSensitivity {
    pub k: usize,
}

impl KCallSiteSensitivity {
    #[must_use]
    pub const fn new(k: usize) -> Self {
        Self { k }
    }

    fn push(&self, ctx: &Context, label: CallLabel) -> Context {
        let mut labels = ctx.0.clone();
        labels.push(label);
        let start = labels.len().saturating_sub(self.k);
        Context(labels[start..].to_vec())
    }
}

impl ContextSelector for KCallSiteSensitivity {
    fn empty_context(&self) -> Context {
        Context::empty()
    }

    fn select_context(
        &self,
        caller_ctx: &Context,
        call_site: &CallSiteId<MethodId>,
        _callee: &MethodId,
    ) -> Context {
        if self.k == 0 {
            return Context::empty();
        }
        self.push(caller_ctx, CallLabel(call_site.clone()))
    }

    fn select_context_with_recv(
        &self,
        caller_ctx: &Context,
        call_site: &CallSiteId<MethodId>,
        _recv_obj: &CsObj,
        callee: &MethodId,
    ) -> Context {
        self.select_context(caller_ctx, call_site, callee)
    }

    fn select_heap_context(&self, cs_method: &CsMethod, _obj: &Obj) -> Context {
        cs_method.ctx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ClassId, StmtId, Subsignature};

    fn method(name: &str) -> MethodId {
        MethodId {
            declaring_class: ClassId::from("Main"),
            subsignature: Subsignature::new(name),
        }
    }

    #[test]
    fn k_limits_context_depth() {
        let sel = KCallSiteSensitivity::new(1);
        let empty = sel.empty_context();
        let cs1 = CallSiteId {
            caller: method("a()"),
            stmt: StmtId(0),
        };
        let ctx1 = sel.select_context(&empty, &cs1, &method("b()"));
        assert_eq!(ctx1.0.len(), 1);
        let cs2 = CallSiteId {
            caller: method("b()"),
            stmt: StmtId(1),
        };
        let ctx2 = sel.select_context(&ctx1, &cs2, &method("c()"));
        assert_eq!(ctx2.0.len(), 1);
        assert_eq!(ctx2.0[0].0, cs2);
    }
}

//! The heap abstraction: allocation-site objects and the `HeapModel`
//! collaborator (`§6`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ir::{ClassId, MethodId, StmtId};

/// The `New` statement that allocated an object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocSite {
    pub method: MethodId,
    pub stmt: StmtId,
}

impl fmt::Display for AllocSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method, self.stmt)
    }
}

/// An abstract heap object, uniquely identified by its allocation site
/// (`§3`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Obj {
    pub site: AllocSite,
    pub ty: ClassId,
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site, self.ty)
    }
}

/// `obj(allocationSite) -> Obj` (`§6`). The default implementation below
/// mints exactly one abstract object per allocation site; an embedder
/// wanting a coarser abstraction (e.g. type-based heap merging) implements
/// this trait directly instead.
pub trait HeapModel {
    fn obj(&self, site: AllocSite, ty: ClassId) -> Obj;
}

/// One abstract object per allocation site, no further merging -- the
/// precise end of the spectrum and the default the solvers use.
#[derive(Debug, Default)]
pub struct AllocSiteHeapModel;

impl HeapModel for AllocSiteHeapModel {
    fn obj(&self, site: AllocSite, ty: ClassId) -> Obj {
        Obj { site, ty }
    }
}

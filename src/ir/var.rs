//! Local variables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A local variable, identified by its index within the owning method's
/// variable table. Cheap to copy; look up its type and name through
/// [`crate::ir::method::Method::var_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// The declared name and static type of a [`VarId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarInfo {
    pub name: String,
    pub ty: crate::ir::types::Type,
}

//! Pointer analysis: `§4.D` (context-insensitive) and `§4.E`
//! (context-sensitive), built over the shared heap/pointer/context
//! machinery in this module's leaves.

pub mod ci;
pub mod context;
pub mod cs;
pub mod heap;
pub mod pointer;

pub use ci::{CiPta, CiPtaResult};
pub use context::{CallLabel, Context, ContextSelector, CsMethod, CsObj, KCallSiteSensitivity};
pub use cs::{CsPta, CsPtaResult, CsVar, Ptr as CsPointer};
pub use heap::{AllocSite, AllocSiteHeapModel, HeapModel, Obj};
pub use pointer::{MethodVar, Pointer, PointerFlowGraph, PointsToSet};

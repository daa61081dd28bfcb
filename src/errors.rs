//! Error taxonomy (`§7`): configuration problems are collected and
//! reported per-entry without aborting; internal-invariant and
//! IR-inconsistency problems are fatal and propagate as `Err` to the
//! caller rather than panicking the host process.

use crate::ir::{MethodId, StmtId};

/// A problem loading one taint-configuration entry (`§6` schema). The
/// loader reports these per-entry and skips the offending entry; it never
/// aborts the whole config load over one bad reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("source config references unknown method {0}")]
    UnknownSourceMethod(String),
    #[error("sink config references unknown method {0}")]
    UnknownSinkMethod(String),
    #[error("sink config for {method} names out-of-range parameter index {param_index}")]
    UnknownSinkParam { method: String, param_index: usize },
    #[error("transfer config references unknown method {0}")]
    UnknownTransferMethod(String),
    #[error("malformed taint config: {0}")]
    Malformed(String),
}

/// A fatal internal error (`§7`): a lattice law was violated, or the IR
/// itself is inconsistent in a way no analysis can recover from. These
/// are never swallowed -- an analysis either returns a result or returns
/// one of these, propagated by `?` to the top-level caller instead of
/// aborting the process outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("lattice meet is not commutative/idempotent for the supplied facts")]
    InvariantViolation,
    #[error("call to {callee} at {call_site} passes {actual} argument(s) but expects {expected}")]
    ArityMismatch {
        callee: MethodId,
        call_site: StmtId,
        expected: usize,
        actual: usize,
    },
    #[error("method body missing for {0}, but it is reachable")]
    MissingBody(MethodId),
}

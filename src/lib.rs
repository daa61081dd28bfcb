#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    rust_2021_compatibility
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

//! `latticework` is a whole-program static analysis core over a typed,
//! object-oriented three-address IR.
//!
//! It builds a class hierarchy and a CHA call graph ([`cha`], [`hierarchy`]),
//! runs intraprocedural dataflow analyses on top of a generic monotone
//! fixpoint framework ([`lattice`], [`dataflow`]), builds an inclusion-based
//! pointer analysis in both context-insensitive and context-sensitive
//! flavors ([`pta`]), lifts constant propagation to a whole-program
//! fixpoint over an inter-procedural control-flow graph ([`icfg`],
//! [`interprop`]), overlays a taint-propagation pass on top of an already
//! solved pointer analysis ([`taint`]), and finishes with a dead-code
//! detector driven by the intraprocedural results ([`dead_code`]).
//!
//! Configuration (which PTA variant to run, and the taint sources/sinks/
//! transfers) is loaded from JSON ([`config`]); [`result`] is a typed
//! store for keeping several named analysis outputs side by side;
//! [`errors`] distinguishes recoverable configuration problems from fatal
//! internal ones.

pub mod cha;
pub mod config;
pub mod dataflow;
pub mod dead_code;
pub mod errors;
pub mod hierarchy;
pub mod icfg;
pub mod interprop;
pub mod ir;
pub mod lattice;
pub mod pta;
pub mod result;
pub mod taint;

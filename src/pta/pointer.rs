//! Shared points-to machinery: [`Pointer`]/[`PointsToSet`]/the
//! Pointer-Flow Graph (`§3` PFG), generic over the variable/object
//! representation so the context-insensitive ([`crate::pta::ci`]) and
//! context-sensitive ([`crate::pta::cs`]) solvers reuse the same shapes
//! with `MethodVar`/`Obj` or `CsVar`/`CsObj` respectively.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::ir::{FieldRef, MethodId, VarId};

/// A variable, identified across the whole program by the method that
/// declares it plus its local index. `Var`s in the IR are scoped to a
/// single method; a [`Pointer`] must name one uniquely program-wide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodVar {
    pub method: MethodId,
    pub var: VarId,
}

impl fmt::Display for MethodVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.method, self.var)
    }
}

/// A points-to container: `VarPtr`/`CSVar` (generic `V`), `InstanceField`,
/// `StaticField`, `ArrayIndex` (generic object representation `O`).
/// Array indices are merged into a single `ArrayIndex(obj)` node -- no
/// index sensitivity (`§3`, `§9` open question 4).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pointer<V, O> {
    Var(V),
    InstanceField(O, FieldRef),
    StaticField(FieldRef),
    ArrayIndex(O),
}

/// A monotonically growing set of heap objects (`§3`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsToSet<O: Ord> {
    objects: BTreeSet<O>,
}

impl<O: Ord> Default for PointsToSet<O> {
    fn default() -> Self {
        Self {
            objects: BTreeSet::new(),
        }
    }
}

impl<O: Ord + Clone> PointsToSet<O> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn singleton(o: O) -> Self {
        let mut s = Self::new();
        s.add_object(o);
        s
    }

    /// Adds `o`; returns whether it was new (monotonic growth, `§3`
    /// invariant 2).
    pub fn add_object(&mut self, o: O) -> bool {
        self.objects.insert(o)
    }

    #[must_use]
    pub fn contains(&self, o: &O) -> bool {
        self.objects.contains(o)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &O> {
        self.objects.iter()
    }

    /// Adds every object of `other` not already present, returning the
    /// objects that were newly added -- the Δ `propagate` computes.
    pub fn union_from(&mut self, other: &Self) -> Vec<O> {
        other
            .objects
            .iter()
            .filter(|o| self.objects.insert((*o).clone()))
            .cloned()
            .collect()
    }
}

impl<O: Ord + Clone> FromIterator<O> for PointsToSet<O> {
    fn from_iter<I: IntoIterator<Item = O>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

/// The Pointer-Flow Graph: an edge `src -> tgt` means every object in
/// `pt(src)` must be in `pt(tgt)`. Edges persist once added (`§3`
/// invariant 3).
#[derive(Debug, Clone)]
pub struct PointerFlowGraph<V, O> {
    successors: BTreeMap<Pointer<V, O>, BTreeSet<Pointer<V, O>>>,
}

impl<V: Ord + Clone, O: Ord + Clone> Default for PointerFlowGraph<V, O> {
    fn default() -> Self {
        Self {
            successors: BTreeMap::new(),
        }
    }
}

impl<V: Ord + Clone, O: Ord + Clone> PointerFlowGraph<V, O> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge; returns whether it was new.
    pub fn add_edge(&mut self, src: Pointer<V, O>, tgt: Pointer<V, O>) -> bool {
        self.successors.entry(src).or_default().insert(tgt)
    }

    pub fn successors(&self, p: &Pointer<V, O>) -> impl Iterator<Item = &Pointer<V, O>> {
        self.successors.get(p).into_iter().flatten()
    }

    /// Every edge as `(src, tgt)`, ordered for deterministic iteration
    /// (structural invariant checks and tests walk this).
    pub fn edges(&self) -> impl Iterator<Item = (&Pointer<V, O>, &Pointer<V, O>)> {
        self.successors
            .iter()
            .flat_map(|(src, tgts)| tgts.iter().map(move |t| (src, t)))
    }
}

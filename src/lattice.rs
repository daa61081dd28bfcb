//! The lattices and facts shared by every data-flow analysis: the
//! three-valued constant-propagation lattice, its per-variable fact map,
//! and a generic set fact for "may" analyses.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::ir::VarId;

/// A confluence operator over a bounded lattice. Despite the name, `meet`
/// is used for both "meet" (constant propagation, where `NAC` is top) and
/// "join" (live-variable union) confluence points -- the invariants are
/// the same either way: commutative, associative, idempotent, with
/// `bottom()` as identity.
pub trait MeetSemilattice: Clone + PartialEq {
    /// The identity element: `meet(bottom(), x) == x` for all `x`.
    fn bottom() -> Self;

    /// Combines two facts at a confluence point in the control-flow graph.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;
}

/// The three-valued constant-propagation lattice: `UNDEF ⊑ CONST(c) ⊑ NAC`,
/// with distinct constants meeting to `NAC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Undef,
    Const(i32),
    Nac,
}

impl Value {
    /// `self ⊑ other`.
    #[must_use]
    pub fn le(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undef, _) | (_, Value::Nac) => true,
            (Value::Const(a), Value::Const(b)) => a == b,
            (Value::Nac, _) | (_, Value::Undef) => self == other,
        }
    }

    #[must_use]
    pub const fn is_const(&self) -> bool {
        matches!(self, Self::Const(_))
    }

    #[must_use]
    pub const fn as_const(&self) -> Option<i32> {
        match self {
            Self::Const(c) => Some(*c),
            _ => None,
        }
    }
}

impl MeetSemilattice for Value {
    fn bottom() -> Self {
        Self::Undef
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Nac, _) | (_, Self::Nac) => Self::Nac,
            (Self::Const(a), Self::Const(b)) => {
                if a == b {
                    Self::Const(*a)
                } else {
                    Self::Nac
                }
            }
            (Self::Const(c), Self::Undef) | (Self::Undef, Self::Const(c)) => Self::Const(*c),
            (Self::Undef, Self::Undef) => Self::Undef,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undef => write!(f, "UNDEF"),
            Self::Const(c) => write!(f, "{c}"),
            Self::Nac => write!(f, "NAC"),
        }
    }
}

/// A partial mapping from [`VarId`] to [`Value`]. A missing key means
/// `UNDEF`; equality is semantic, ignoring explicit `UNDEF` bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CPFact {
    bindings: BTreeMap<VarId, Value>,
}

impl CPFact {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `in[v]`, defaulting to `UNDEF` for variables with no binding.
    #[must_use]
    pub fn get(&self, v: VarId) -> Value {
        self.bindings.get(&v).copied().unwrap_or(Value::Undef)
    }

    /// Sets `v`'s value, dropping the binding entirely if it becomes
    /// `UNDEF` so that the sparse representation stays canonical.
    pub fn set(&mut self, v: VarId, value: Value) {
        if value == Value::Undef {
            self.bindings.remove(&v);
        } else {
            self.bindings.insert(v, value);
        }
    }

    /// The set of variables with a non-`UNDEF` binding.
    pub fn keys(&self) -> impl Iterator<Item = VarId> + '_ {
        self.bindings.keys().copied()
    }

    /// `meetInto(self, tgt)`: folds every binding of `self` into `tgt`.
    pub fn meet_into(&self, tgt: &mut Self) {
        for k in self.keys() {
            let merged = self.get(k).meet(&tgt.get(k));
            tgt.set(k, merged);
        }
    }
}

impl PartialEq for CPFact {
    fn eq(&self, other: &Self) -> bool {
        self.bindings == other.bindings
    }
}

impl MeetSemilattice for CPFact {
    fn bottom() -> Self {
        Self::new()
    }

    fn meet(&self, other: &Self) -> Self {
        let mut result = other.clone();
        self.meet_into(&mut result);
        result
    }
}

impl fmt::Display for CPFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

/// A generic ordered-set fact, used by the live-variable analysis and by
/// anything else that needs set-union confluence.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetFact<T: Ord> {
    elements: BTreeSet<T>,
}

impl<T: Ord> Default for SetFact<T> {
    fn default() -> Self {
        Self {
            elements: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> SetFact<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: T) -> bool {
        self.elements.insert(item)
    }

    pub fn remove(&mut self, item: &T) -> bool {
        self.elements.remove(item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.elements.contains(item)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            elements: self.elements.union(&other.elements).cloned().collect(),
        }
    }

    /// Replaces the contents with `other`'s.
    pub fn set_assign(&mut self, other: &Self) {
        self.elements.clone_from(&other.elements);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T: Ord + Clone> FromIterator<T> for SetFact<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<T: Ord + Clone> MeetSemilattice for SetFact<T> {
    fn bottom() -> Self {
        Self::new()
    }

    fn meet(&self, other: &Self) -> Self {
        self.union(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Undef),
            Just(Value::Nac),
            any::<i32>().prop_map(Value::Const),
        ]
    }

    proptest! {
        #[test]
        fn meet_is_commutative(a in arb_value(), b in arb_value()) {
            prop_assert_eq!(a.meet(&b), b.meet(&a));
        }

        #[test]
        fn undef_is_identity(a in arb_value()) {
            prop_assert_eq!(a.meet(&Value::Undef), a);
        }

        #[test]
        fn nac_is_absorbing(a in arb_value()) {
            prop_assert_eq!(a.meet(&Value::Nac), Value::Nac);
        }

        #[test]
        fn meet_is_idempotent(a in arb_value()) {
            prop_assert_eq!(a.meet(&a), a);
        }

        #[test]
        fn meet_is_associative(a in arb_value(), b in arb_value(), c in arb_value()) {
            prop_assert_eq!(a.meet(&b).meet(&c), a.meet(&b.meet(&c)));
        }
    }

    #[test]
    fn distinct_constants_meet_to_nac() {
        assert_eq!(Value::Const(1).meet(&Value::Const(2)), Value::Nac);
        assert_eq!(Value::Const(1).meet(&Value::Const(1)), Value::Const(1));
    }

    #[test]
    fn cpfact_missing_key_is_undef() {
        let fact = CPFact::new();
        assert_eq!(fact.get(VarId(0)), Value::Undef);
    }

    #[test]
    fn cpfact_equality_ignores_explicit_undef() {
        let mut a = CPFact::new();
        let mut b = CPFact::new();
        a.set(VarId(0), Value::Const(1));
        a.set(VarId(0), Value::Undef);
        b.set(VarId(1), Value::Undef);
        assert_eq!(a, b);
    }
}

//! Class-hierarchy queries: the `directSubclassesOf`/`directSubinterfacesOf`/
//! `directImplementorsOf`/`superClassOf`/`declaredMethod` collaborator CHA
//! and the pointer analyses dispatch against.
//!
//! Subclass/subinterface/implementor sets are computed with
//! `petgraph::visit::depth_first_search`, pruned at the first edge so only
//! the *direct* relation is reported -- the transitive walk used by CHA's
//! dispatch resolution (`§4.B`) lives in [`crate::cha`].

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::visit::{Control, DfsEvent, GraphBase, IntoNeighbors, VisitMap, Visitable, depth_first_search};

use crate::ir::{ClassId, MethodId, Program, Subsignature, types::MethodRef};

/// A read-only view over a [`Program`]'s class relationships.
#[derive(Debug)]
pub struct ClassHierarchy<'p> {
    program: &'p Program,
    /// class -> direct superclass
    super_classes: HashMap<ClassId, ClassId>,
    /// superclass -> direct subclasses
    direct_subclasses: HashMap<ClassId, HashSet<ClassId>>,
    /// interface -> classes/interfaces that directly implement/extend it
    direct_interface_edges: HashMap<ClassId, HashSet<ClassId>>,
}

impl<'p> ClassHierarchy<'p> {
    /// Builds a hierarchy view over every class in `program`.
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        let mut super_classes = HashMap::new();
        let mut direct_subclasses: HashMap<ClassId, HashSet<ClassId>> = HashMap::new();
        let mut direct_interface_edges: HashMap<ClassId, HashSet<ClassId>> = HashMap::new();
        for class in program.classes.values() {
            if let Some(super_class) = &class.super_class {
                direct_subclasses
                    .entry(super_class.clone())
                    .or_default()
                    .insert(class.id.clone());
                super_classes.insert(class.id.clone(), super_class.clone());
            }
            for interface in &class.interfaces {
                direct_interface_edges
                    .entry(interface.clone())
                    .or_default()
                    .insert(class.id.clone());
            }
        }
        Self {
            program,
            super_classes,
            direct_subclasses,
            direct_interface_edges,
        }
    }

    /// The direct superclass of `class`, if any.
    #[must_use]
    pub fn super_class_of(&self, class: &ClassId) -> Option<&ClassId> {
        self.super_classes.get(class)
    }

    /// Classes that directly extend `class` (non-interface subclasses).
    #[must_use]
    pub fn direct_subclasses_of(&self, class: &ClassId) -> HashSet<ClassId> {
        self.direct_subclasses
            .get(class)
            .into_iter()
            .flatten()
            .filter(|c| !self.is_interface(c))
            .cloned()
            .collect()
    }

    /// Interfaces that directly extend `interface`.
    #[must_use]
    pub fn direct_subinterfaces_of(&self, interface: &ClassId) -> HashSet<ClassId> {
        self.direct_interface_edges
            .get(interface)
            .into_iter()
            .flatten()
            .filter(|c| self.is_interface(c))
            .cloned()
            .collect()
    }

    /// Classes that directly implement `interface`.
    #[must_use]
    pub fn direct_implementors_of(&self, interface: &ClassId) -> HashSet<ClassId> {
        self.direct_interface_edges
            .get(interface)
            .into_iter()
            .flatten()
            .filter(|c| !self.is_interface(c))
            .cloned()
            .collect()
    }

    /// The transitive subclasses of `class`, not including itself.
    #[must_use]
    pub fn subclasses(&self, class: &ClassId) -> HashSet<ClassId> {
        let mut subclasses = HashSet::new();
        depth_first_search(SubclassGraph(self), [class.clone()], |event| {
            if let DfsEvent::TreeEdge(_, i) = event {
                subclasses.insert(i);
            }
            Control::<()>::Continue
        });
        subclasses.remove(class);
        subclasses
    }

    fn is_interface(&self, class: &ClassId) -> bool {
        self.program
            .class(class)
            .map(|c| c.is_interface)
            .unwrap_or(false)
    }

    /// A method declared directly on `class` with the given subsignature --
    /// does not ascend to superclasses; that is `dispatch`'s job.
    #[must_use]
    pub fn declared_method(&self, class: &ClassId, sig: &Subsignature) -> Option<MethodId> {
        self.program
            .class(class)
            .and_then(|c| c.declared_method(sig))
            .map(|m| m.id.clone())
    }

    /// Whether the method identified by `id` is abstract (or has no body).
    #[must_use]
    pub fn is_abstract(&self, id: &MethodId) -> bool {
        self.program
            .method(id)
            .map(|m| m.is_abstract || m.cfg().is_none())
            .unwrap_or(true)
    }

    /// Grants access to the underlying program.
    #[must_use]
    pub const fn program(&self) -> &'p Program {
        self.program
    }
}

/// A thin `petgraph` adapter walking `subclass` edges (the reverse of
/// `super_class_of`) so `depth_first_search` can traverse it directly,
/// mirroring the teacher-grounded pattern of bridging a custom adjacency
/// map onto `petgraph`'s visitor traits instead of hand-rolling DFS.
#[derive(Clone, Copy)]
struct SubclassGraph<'a, 'p>(&'a ClassHierarchy<'p>);

impl GraphBase for SubclassGraph<'_, '_> {
    type NodeId = ClassId;
    type EdgeId = (ClassId, ClassId);
}

impl IntoNeighbors for SubclassGraph<'_, '_> {
    type Neighbors = std::vec::IntoIter<ClassId>;

    fn neighbors(self, a: ClassId) -> Self::Neighbors {
        self.0
            .direct_subclasses
            .get(&a)
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl Visitable for SubclassGraph<'_, '_> {
    type Map = BTreeSet<ClassId>;

    fn visit_map(&self) -> Self::Map {
        BTreeSet::new()
    }

    fn reset_map(&self, map: &mut Self::Map) {
        map.clear();
    }
}

impl VisitMap<ClassId> for BTreeSet<ClassId> {
    fn visit(&mut self, a: ClassId) -> bool {
        self.insert(a)
    }

    fn is_visited(&self, a: &ClassId) -> bool {
        self.contains(a)
    }
}

/// Resolves a call-site's declared reference to a subsignature used for
/// dispatch (ignores the declared class; dispatch walks from a concrete
/// receiver/start class instead).
#[must_use]
pub fn subsignature_of(method_ref: &MethodRef) -> &Subsignature {
    &method_ref.subsignature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ProgramBuilder;

    fn diamond() -> Program {
        let mut pb = ProgramBuilder::new();
        pb.class("Object", false, None, vec![]);
        pb.class("A", false, Some(ClassId::from("Object")), vec![]);
        pb.class("B", false, Some(ClassId::from("A")), vec![]);
        pb.class("I", true, None, vec![]);
        pb.class(
            "C",
            false,
            Some(ClassId::from("Object")),
            vec![ClassId::from("I")],
        );
        pb.build()
    }

    #[test]
    fn direct_subclasses_and_super() {
        let program = diamond();
        let h = ClassHierarchy::new(&program);
        assert_eq!(
            h.direct_subclasses_of(&ClassId::from("A")),
            HashSet::from([ClassId::from("B")])
        );
        assert_eq!(h.super_class_of(&ClassId::from("B")), Some(&ClassId::from("A")));
    }

    #[test]
    fn transitive_subclasses() {
        let program = diamond();
        let h = ClassHierarchy::new(&program);
        assert_eq!(
            h.subclasses(&ClassId::from("Object")),
            HashSet::from([ClassId::from("A"), ClassId::from("B"), ClassId::from("C")])
        );
    }

    #[test]
    fn implementors() {
        let program = diamond();
        let h = ClassHierarchy::new(&program);
        assert_eq!(
            h.direct_implementors_of(&ClassId::from("I")),
            HashSet::from([ClassId::from("C")])
        );
    }
}

//! A generic control-flow graph, keyed by statement index, with `petgraph`
//! trait implementations so the solvers can reuse graph algorithms instead
//! of hand-rolling traversals.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use petgraph::{
    Directed, Direction,
    visit::{Data, GraphBase, GraphProp, IntoEdgeReferences, IntoNeighbors,
        IntoNeighborsDirected, IntoNodeIdentifiers, IntoNodeReferences, NodeIndexable, VisitMap,
        Visitable},
};
use serde::{Deserialize, Serialize};

/// The index of a statement within a method's control-flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StmtId(pub u32);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for StmtId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// The kind of control-flow edge leaving a statement. `If`/`Switch`
/// statements carry their condition but not their taken branch; the taken
/// branch is this edge label, which is what the dead-code detector walks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfgEdge {
    /// An unconditional, fall-through or goto edge.
    Normal,
    /// The `If` condition evaluated true.
    IfTrue,
    /// The `If` condition evaluated false.
    IfFalse,
    /// A `Switch` case edge for the given value.
    Case(i32),
    /// A `Switch` default edge.
    SwitchDefault,
}

/// A directed graph of statements, keyed by [`StmtId`]. Node and edge
/// weights are generic so the same shape backs the intraprocedural CFG
/// (`N = StmtKind`) and maps cleanly onto the ICFG's edge-kind overlay.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph<N, E> {
    inner: BTreeMap<StmtId, (N, BTreeMap<StmtId, E>)>,
}

impl<N, E> Default for ControlFlowGraph<N, E> {
    fn default() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }
}

impl<N, E> ControlFlowGraph<N, E> {
    /// The entry point of the control-flow graph.
    #[must_use]
    pub const fn entry_point(&self) -> StmtId {
        StmtId(0)
    }

    /// Looks up the weight of a node.
    #[must_use]
    pub fn node(&self, id: StmtId) -> Option<&N> {
        self.inner.get(&id).map(|(n, _)| n)
    }

    /// Iterates over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (StmtId, &N)> {
        self.inner.iter().map(|(n, (d, _))| (*n, d))
    }

    /// Iterates over all edges.
    pub fn edges(&self) -> impl Iterator<Item = (StmtId, StmtId, &E)> {
        self.inner.iter().flat_map(|(src, (_, outgoing))| {
            outgoing.iter().map(|(dst, data)| (*src, *dst, data))
        })
    }

    /// Iterates over the edges leaving `src`.
    pub fn edges_from(&self, src: StmtId) -> impl Iterator<Item = (StmtId, &E)> {
        self.inner
            .get(&src)
            .into_iter()
            .flat_map(|(_, out)| out.iter().map(|(dst, e)| (*dst, e)))
    }

    /// Iterates over the edges entering `dst`. Computed on demand; fine for
    /// method-sized graphs, no precomputed reverse index is kept.
    pub fn edges_into(&self, dst: StmtId) -> impl Iterator<Item = (StmtId, &E)> {
        self.inner.iter().filter_map(move |(src, (_, out))| {
            out.get(&dst).map(|e| (*src, e))
        })
    }

    /// Iterates over nodes with no outgoing edges.
    pub fn exits(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.inner
            .iter()
            .filter(|(_, (_, out))| out.is_empty())
            .map(|(n, _)| *n)
    }

}

impl<N, E> ControlFlowGraph<N, E>
where
    N: Clone,
{
    /// Builds a control-flow graph from per-node weights and edges.
    ///
    /// # Panics
    /// Panics if an edge references a node not present in `nodes`, or if a
    /// duplicate edge is supplied.
    #[must_use]
    pub fn build(
        nodes: impl IntoIterator<Item = (StmtId, N)>,
        edges: impl IntoIterator<Item = (StmtId, StmtId, E)>,
    ) -> Self {
        let mut inner: BTreeMap<StmtId, (N, BTreeMap<StmtId, E>)> = nodes
            .into_iter()
            .map(|(id, w)| (id, (w, BTreeMap::new())))
            .collect();
        for (src, dst, data) in edges {
            let (_, out) = inner.get_mut(&src).expect("edge source not a known node");
            assert!(
                inner.contains_key(&dst),
                "edge target not a known node"
            );
            assert!(out.insert(dst, data).is_none(), "duplicate edge");
        }
        Self { inner }
    }
}


impl<N, E> Data for ControlFlowGraph<N, E> {
    type NodeWeight = N;
    type EdgeWeight = E;
}

impl<'a, N, E> IntoNodeReferences for &'a ControlFlowGraph<N, E> {
    type NodeRef = (StmtId, &'a N);
    type NodeReferences = std::vec::IntoIter<Self::NodeRef>;

    fn node_references(self) -> Self::NodeReferences {
        self.inner
            .iter()
            .map(|(n, (d, _))| (*n, d))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl<'a, N, E> IntoEdgeReferences for &'a ControlFlowGraph<N, E> {
    type EdgeRef = (StmtId, StmtId, &'a E);
    type EdgeReferences = std::vec::IntoIter<Self::EdgeRef>;

    fn edge_references(self) -> Self::EdgeReferences {
        self.edges().collect::<Vec<_>>().into_iter()
    }
}

impl<N, E> GraphBase for ControlFlowGraph<N, E> {
    type NodeId = StmtId;
    type EdgeId = (StmtId, StmtId);
}

/// A visit map for `petgraph` traversals over [`ControlFlowGraph`].
pub type Visited = BTreeSet<StmtId>;

impl VisitMap<StmtId> for Visited {
    fn visit(&mut self, a: StmtId) -> bool {
        self.insert(a)
    }

    fn is_visited(&self, a: &StmtId) -> bool {
        self.contains(a)
    }
}

impl<N, E> Visitable for ControlFlowGraph<N, E> {
    type Map = Visited;

    fn visit_map(&self) -> Self::Map {
        BTreeSet::new()
    }

    fn reset_map(&self, map: &mut Self::Map) {
        map.clear();
    }
}

impl<'a, N, E> IntoNodeIdentifiers for &'a ControlFlowGraph<N, E> {
    type NodeIdentifiers = std::vec::IntoIter<StmtId>;

    fn node_identifiers(self) -> Self::NodeIdentifiers {
        self.inner.keys().copied().collect::<Vec<_>>().into_iter()
    }
}

impl<'a, N, E> IntoNeighbors for &'a ControlFlowGraph<N, E> {
    type Neighbors = std::vec::IntoIter<StmtId>;

    fn neighbors(self, a: StmtId) -> Self::Neighbors {
        self.neighbors_directed(a, Direction::Outgoing)
    }
}

impl<'a, N, E> IntoNeighborsDirected for &'a ControlFlowGraph<N, E> {
    type NeighborsDirected = std::vec::IntoIter<StmtId>;

    fn neighbors_directed(self, n: StmtId, d: Direction) -> Self::NeighborsDirected {
        match d {
            Direction::Outgoing => self.edges_from(n).map(|(dst, _)| dst).collect::<Vec<_>>(),
            Direction::Incoming => self.edges_into(n).map(|(src, _)| src).collect::<Vec<_>>(),
        }
        .into_iter()
    }
}

impl<N, E> NodeIndexable for ControlFlowGraph<N, E> {
    fn node_bound(&self) -> usize {
        self.inner.len()
    }

    fn to_index(&self, ix: StmtId) -> usize {
        ix.0 as usize
    }

    fn from_index(&self, ix: usize) -> StmtId {
        StmtId(u32::try_from(ix).expect("index out of u32 range"))
    }
}

impl<N, E> GraphProp for ControlFlowGraph<N, E> {
    type EdgeType = Directed;
}

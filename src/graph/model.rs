use nalgebra::DMatrix;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::graph::matrix::{Edge, Symmetrization};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProblem {
    pub vertex_count: usize,
    pub clusters: usize,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub adjacency: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub groups: Vec<Vec<usize>>,
    #[serde(default)]
    pub reference: Option<Vec<Vec<usize>>>,
    #[serde(default)]
    pub symmetrize: Option<Symmetrization>,
}

/// How the graph of a problem was supplied.
#[derive(Debug, Clone)]
pub enum GraphInput {
    Edges(Vec<Edge>),
    Adjacency(DMatrix<f64>),
}

/// A fully resolved clustering problem: graph, protected groups, requested cluster count.
#[derive(Debug, Clone)]
pub struct ClusteringProblem {
    pub vertex_count: usize,
    pub clusters: usize,
    pub input: GraphInput,
    /// Directed edge list used for cut counting, derived from the adjacency when needed.
    pub edges: Vec<Edge>,
    pub groups: Vec<Vec<usize>>,
    pub reference: Option<Vec<Vec<usize>>>,
}

impl ClusteringProblem {
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Directed petgraph view over the edge list, for structural diagnostics.
    pub fn to_graph(&self) -> DiGraph<(), ()> {
        let mut graph = DiGraph::with_capacity(self.vertex_count, self.edges.len());
        let nodes: Vec<_> = (0..self.vertex_count).map(|_| graph.add_node(())).collect();
        for &(source, target) in &self.edges {
            if let (Some(&s), Some(&t)) = (nodes.get(source), nodes.get(target)) {
                graph.add_edge(s, t, ());
            }
        }
        graph
    }

    /// Number of weakly connected components of the graph.
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.to_graph())
    }
}

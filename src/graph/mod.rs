pub mod construction;
pub mod matrix;
pub mod model;

pub use construction::ProblemLoader;
pub use matrix::{
    build_adjacency, build_laplacian, degree_vector, normalized_laplacian, symmetrize, Edge,
    Symmetrization,
};
pub use model::{ClusteringProblem, GraphInput, RawProblem};

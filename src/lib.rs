pub mod cluster;
pub mod error;
pub mod fairness;
pub mod graph;
pub mod metrics;
pub mod pipeline;
pub mod spectral;

pub use cluster::{KMeansConfig, Partition, RowClusterer};
pub use error::{ClusteringError, Result};
pub use fairness::FairnessProjector;
pub use graph::{ClusteringProblem, Edge, GraphInput, ProblemLoader, Symmetrization};
pub use metrics::{balance, contingency, cut_count, misclassification, misclassification_error};
pub use pipeline::{
    fair_cluster, fair_cluster_from_adjacency, unconstrained_cluster,
    unconstrained_cluster_from_adjacency, ClusteringConfig, ClusteringReport, ClusteringSummary,
    ClusteringWorkflow,
};
pub use spectral::{EigenvectorCount, EmbeddingSolver, Normalization};

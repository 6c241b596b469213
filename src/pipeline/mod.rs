pub mod report;
pub mod workflow;

pub use report::ClusteringReport;
pub use workflow::{
    fair_cluster, fair_cluster_from_adjacency, unconstrained_cluster,
    unconstrained_cluster_from_adjacency, ClusteringConfig, ClusteringSummary, ClusteringWorkflow,
};

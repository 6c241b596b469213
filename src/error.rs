use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusteringError>;

/// Failure kinds surfaced by the clustering pipeline.
///
/// Every variant is a deterministic precondition or numerical-state failure; none of them is
/// transient, so callers should not retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusteringError {
    /// Index out of range, mismatched partition cardinalities or non-conforming matrix shapes.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// A vertex has zero degree where a degree inverse or square root is required.
    #[error("vertex {vertex} has zero degree; the normalized variant needs every degree > 0")]
    DegenerateDegree { vertex: usize },

    /// The fairness null space leaves too few directions for the requested embedding.
    #[error("fairness null space has dimension {dimension}, at least {required} required")]
    RankDeficiency { dimension: usize, required: usize },

    /// The projected degree operator is not positive definite, so it has no SPD square root.
    #[error("projected degree operator is not positive definite (smallest eigenvalue {min_eigenvalue:e})")]
    NonPositiveDefinite { min_eigenvalue: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("linear algebra failure: {0}")]
    LinearAlgebra(String),
}

impl ClusteringError {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    pub(crate) fn vertex_out_of_range(context: &str, vertex: usize, vertex_count: usize) -> Self {
        Self::shape(
            format!("{context} (vertex {vertex} outside [0, {vertex_count}))"),
            vertex_count,
            vertex,
        )
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}

use log::warn;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ClusteringError, Result};

/// Directed `(source, target)` pair of vertex indices.
pub type Edge = (usize, usize);

/// How a possibly asymmetric adjacency matrix is folded into a symmetric one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symmetrization {
    /// Keep (i, j) when either direction is present.
    Union,
    /// Keep (i, j) only when both directions are present.
    Intersection,
}

/// Binary adjacency matrix with `A[(i, j)] = 1` for every listed edge.
pub fn build_adjacency(n: usize, edges: &[Edge]) -> Result<DMatrix<f64>> {
    if n == 0 {
        return Err(ClusteringError::config("vertex count must be positive"));
    }
    let mut adjacency = DMatrix::zeros(n, n);
    for &(source, target) in edges {
        if source >= n {
            return Err(ClusteringError::vertex_out_of_range("edge source", source, n));
        }
        if target >= n {
            return Err(ClusteringError::vertex_out_of_range("edge target", target, n));
        }
        adjacency[(source, target)] = 1.0;
    }
    Ok(adjacency)
}

/// Row sums (out-degrees) of the adjacency matrix.
pub fn degree_vector(adjacency: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        adjacency.nrows(),
        adjacency.row_iter().map(|row| row.iter().sum::<f64>()),
    )
}

/// Combinatorial Laplacian `L = D - A`.
pub fn build_laplacian(adjacency: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    ensure_square(adjacency, "laplacian input")?;
    let degrees = degree_vector(adjacency);
    Ok(DMatrix::from_diagonal(&degrees) - adjacency)
}

/// Symmetric normalized Laplacian \( D^{-1/2} L D^{-1/2} \).
pub fn normalized_laplacian(adjacency: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let laplacian = build_laplacian(adjacency)?;
    let inv_sqrt = inverse_sqrt_degrees(&degree_vector(adjacency))?;
    let n = laplacian.nrows();
    Ok(DMatrix::from_fn(n, n, |i, j| {
        laplacian[(i, j)] * inv_sqrt[i] * inv_sqrt[j]
    }))
}

/// `1 / sqrt(d_i)` for every degree, rejecting the first zero degree.
pub fn inverse_sqrt_degrees(degrees: &DVector<f64>) -> Result<DVector<f64>> {
    if let Some(vertex) = degrees.iter().position(|d| *d <= 0.0) {
        return Err(ClusteringError::DegenerateDegree { vertex });
    }
    Ok(degrees.map(|d| 1.0 / d.sqrt()))
}

pub fn is_symmetric(adjacency: &DMatrix<f64>) -> bool {
    adjacency.is_square() && adjacency == &adjacency.transpose()
}

pub fn symmetrize(adjacency: &DMatrix<f64>, mode: Symmetrization) -> Result<DMatrix<f64>> {
    ensure_square(adjacency, "symmetrize input")?;
    let n = adjacency.nrows();
    Ok(DMatrix::from_fn(n, n, |i, j| {
        let forward = adjacency[(i, j)] != 0.0;
        let backward = adjacency[(j, i)] != 0.0;
        let keep = match mode {
            Symmetrization::Union => forward || backward,
            Symmetrization::Intersection => forward && backward,
        };
        if keep {
            1.0
        } else {
            0.0
        }
    }))
}

/// Validates a caller-supplied adjacency matrix against the declared vertex count.
pub fn check_adjacency(n: usize, adjacency: &DMatrix<f64>) -> Result<()> {
    if n == 0 {
        return Err(ClusteringError::config("vertex count must be positive"));
    }
    if adjacency.nrows() != n {
        return Err(ClusteringError::shape("adjacency rows", n, adjacency.nrows()));
    }
    if adjacency.ncols() != n {
        return Err(ClusteringError::shape(
            "adjacency columns",
            n,
            adjacency.ncols(),
        ));
    }
    if adjacency.iter().any(|v| !v.is_finite()) {
        return Err(ClusteringError::LinearAlgebra(
            "adjacency contains non-finite entries".to_string(),
        ));
    }
    let non_binary = adjacency.iter().filter(|v| **v != 0.0 && **v != 1.0).count();
    if non_binary > 0 {
        warn!(
            "adjacency has {} non-binary entries; using them as given",
            non_binary
        );
    }
    Ok(())
}

/// Edge list recovered from the non-zero entries of an adjacency matrix, row-major.
pub fn edges_from_adjacency(adjacency: &DMatrix<f64>) -> Vec<Edge> {
    let mut edges = Vec::new();
    for i in 0..adjacency.nrows() {
        for j in 0..adjacency.ncols() {
            if adjacency[(i, j)] != 0.0 {
                edges.push((i, j));
            }
        }
    }
    edges
}

pub(crate) fn ensure_square(matrix: &DMatrix<f64>, context: &str) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(ClusteringError::shape(context, matrix.nrows(), matrix.ncols()));
    }
    Ok(())
}

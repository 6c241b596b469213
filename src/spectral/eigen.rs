use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{ClusteringError, Result};
use crate::graph::matrix::ensure_square;

/// Relative floor below which an eigenvalue of `Q^2` is treated as non-positive.
pub const PD_TOLERANCE: f64 = 1e-10;

/// Eigenvalues in ascending order with their eigenvectors as matching columns.
#[derive(Debug, Clone)]
pub struct SortedEigen {
    pub eigenvalues: DVector<f64>,
    pub eigenvectors: DMatrix<f64>,
}

impl SortedEigen {
    pub fn order(&self) -> usize {
        self.eigenvalues.len()
    }

    /// The `count` eigenvectors belonging to the smallest eigenvalues.
    pub fn smallest(&self, count: usize) -> Result<DMatrix<f64>> {
        if count > self.order() {
            return Err(ClusteringError::RankDeficiency {
                dimension: self.order(),
                required: count,
            });
        }
        Ok(self.eigenvectors.columns(0, count).into_owned())
    }
}

/// Dense symmetric eigendecomposition sorted ascending.
///
/// The input is symmetrized as `(M + M^T) / 2` first, so a Laplacian built from a slightly
/// asymmetric adjacency still yields real, orthonormal eigenvectors.
pub fn sorted_eigenpairs(matrix: &DMatrix<f64>) -> Result<SortedEigen> {
    ensure_square(matrix, "eigendecomposition input")?;
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(ClusteringError::LinearAlgebra(
            "eigendecomposition input contains non-finite entries".to_string(),
        ));
    }
    if matrix.nrows() == 0 {
        return Ok(SortedEigen {
            eigenvalues: DVector::zeros(0),
            eigenvectors: DMatrix::zeros(0, 0),
        });
    }

    let symmetric = (matrix + matrix.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(symmetric);

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(Ordering::Equal)
    });

    let eigenvalues = DVector::from_iterator(
        order.len(),
        order.iter().map(|&i| eigen.eigenvalues[i]),
    );
    let columns: Vec<_> = order
        .iter()
        .map(|&i| eigen.eigenvectors.column(i).into_owned())
        .collect();
    let eigenvectors = DMatrix::from_columns(&columns);

    Ok(SortedEigen {
        eigenvalues,
        eigenvectors,
    })
}

/// The eigenvectors of the `count` smallest eigenvalues, as columns.
pub fn smallest_eigenvectors(matrix: &DMatrix<f64>, count: usize) -> Result<DMatrix<f64>> {
    sorted_eigenpairs(matrix)?.smallest(count)
}

/// Unique symmetric positive-definite square root of a symmetric matrix, with its inverse.
#[derive(Debug, Clone)]
pub struct SpdRoot {
    pub root: DMatrix<f64>,
    pub inverse: DMatrix<f64>,
}

impl SpdRoot {
    pub fn new(square: &DMatrix<f64>) -> Result<Self> {
        let eigen = sorted_eigenpairs(square)?;
        if eigen.order() == 0 {
            return Ok(Self {
                root: DMatrix::zeros(0, 0),
                inverse: DMatrix::zeros(0, 0),
            });
        }

        let min_eigenvalue = eigen.eigenvalues[0];
        let max_eigenvalue = eigen.eigenvalues[eigen.order() - 1];
        if min_eigenvalue <= PD_TOLERANCE * max_eigenvalue.abs().max(1.0) {
            return Err(ClusteringError::NonPositiveDefinite { min_eigenvalue });
        }

        let vectors = &eigen.eigenvectors;
        let sqrt = eigen.eigenvalues.map(f64::sqrt);
        let inv_sqrt = sqrt.map(|s| 1.0 / s);

        let root = vectors * DMatrix::from_diagonal(&sqrt) * vectors.transpose();
        let inverse = vectors * DMatrix::from_diagonal(&inv_sqrt) * vectors.transpose();
        Ok(Self { root, inverse })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn triangle_laplacian() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            3,
            3,
            &[2.0, -1.0, -1.0, -1.0, 2.0, -1.0, -1.0, -1.0, 2.0],
        )
    }

    #[test]
    fn eigenpairs_are_sorted_ascending() {
        let eigen = sorted_eigenpairs(&triangle_laplacian()).expect("eigen");
        let values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
        for pair in values.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-12);
        }
        assert_abs_diff_eq!(values[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(values[2], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn eigenvectors_follow_their_eigenvalues() {
        let matrix = DMatrix::from_row_slice(2, 2, &[5.0, 0.0, 0.0, 1.0]);
        let eigen = sorted_eigenpairs(&matrix).expect("eigen");
        assert_abs_diff_eq!(eigen.eigenvalues[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eigen.eigenvectors[(1, 0)].abs(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eigen.eigenvectors[(0, 1)].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn smallest_rejects_excess_count() {
        let err = smallest_eigenvectors(&triangle_laplacian(), 4).expect_err("too many");
        assert!(matches!(err, ClusteringError::RankDeficiency { .. }));
    }

    #[test]
    fn spd_root_squares_back() {
        let q2 = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let spd = SpdRoot::new(&q2).expect("spd root");
        let squared = &spd.root * &spd.root;
        let identity = &spd.root * &spd.inverse;
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(squared[(i, j)], q2[(i, j)], epsilon = 1e-10);
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(identity[(i, j)], expected, epsilon = 1e-10);
            }
        }
        assert_abs_diff_eq!(spd.root[(0, 1)], spd.root[(1, 0)], epsilon = 1e-12);
    }

    #[test]
    fn spd_root_rejects_singular_and_indefinite() {
        let singular = triangle_laplacian();
        assert!(matches!(
            SpdRoot::new(&singular),
            Err(ClusteringError::NonPositiveDefinite { .. })
        ));
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        match SpdRoot::new(&indefinite) {
            Err(ClusteringError::NonPositiveDefinite { min_eigenvalue }) => {
                assert_abs_diff_eq!(min_eigenvalue, -1.0, epsilon = 1e-10)
            }
            other => panic!("expected NonPositiveDefinite, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_square_input() {
        let matrix = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            sorted_eigenpairs(&matrix),
            Err(ClusteringError::ShapeMismatch { .. })
        ));
    }
}

use indexmap::IndexSet;
use log::{debug, warn};
use nalgebra::{DMatrix, SVD};

use crate::error::{ClusteringError, Result};
use crate::spectral::eigen::sorted_eigenpairs;

/// Group-proportionality constraints and the orthonormal basis of the subspace that
/// satisfies them.
#[derive(Debug, Clone)]
pub struct FairnessProjector {
    constraint: DMatrix<f64>,
    basis: DMatrix<f64>,
    rank: usize,
}

impl FairnessProjector {
    pub fn new(n: usize, groups: &[Vec<usize>]) -> Result<Self> {
        let covered = group_coverage(n, groups)?;
        if covered < n {
            warn!(
                "groups cover {} of {} vertices; unassigned vertices only shift the group fractions",
                covered, n
            );
        }

        let constraint = constraint_matrix(n, groups)?;
        let (basis, rank) = null_space_with_rank(&constraint)?;
        debug!(
            "fairness projector: n = {}, h = {}, rank(F) = {}, null space dimension = {}",
            n,
            groups.len(),
            rank,
            basis.ncols()
        );
        Ok(Self {
            constraint,
            basis,
            rank,
        })
    }

    pub fn constraint(&self) -> &DMatrix<f64> {
        &self.constraint
    }

    /// `Z`, an n x r matrix with orthonormal columns and `F^T Z = 0`.
    pub fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dimension(&self) -> usize {
        self.basis.ncols()
    }

    pub fn ensure_capacity(&self, required: usize) -> Result<()> {
        if self.dimension() < required {
            return Err(ClusteringError::RankDeficiency {
                dimension: self.dimension(),
                required,
            });
        }
        Ok(())
    }

    pub fn residual(&self) -> f64 {
        max_constraint_residual(&self.constraint, &self.basis)
    }
}

/// `F`, n x (h - 1): column j is the indicator of group j minus `|group_j| / n`.
///
/// The last group's column is dropped because the h centred indicators sum to zero.
pub fn constraint_matrix(n: usize, groups: &[Vec<usize>]) -> Result<DMatrix<f64>> {
    if n == 0 {
        return Err(ClusteringError::config("vertex count must be positive"));
    }
    if groups.is_empty() {
        return Err(ClusteringError::config("group partition is empty"));
    }

    let columns = groups.len() - 1;
    let mut constraint = DMatrix::zeros(n, columns);
    for (j, group) in groups.iter().take(columns).enumerate() {
        for &vertex in group {
            if vertex >= n {
                return Err(ClusteringError::vertex_out_of_range("group member", vertex, n));
            }
            constraint[(vertex, j)] = 1.0;
        }
        let fraction = group.len() as f64 / n as f64;
        for value in constraint.column_mut(j).iter_mut() {
            *value -= fraction;
        }
    }
    Ok(constraint)
}

/// Orthonormal basis of the null space of `F^T`.
pub fn null_space_basis(constraint: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    null_space_with_rank(constraint).map(|(basis, _)| basis)
}

/// Largest absolute entry of `F^T Z`.
pub fn max_constraint_residual(constraint: &DMatrix<f64>, basis: &DMatrix<f64>) -> f64 {
    (constraint.transpose() * basis).amax()
}

/// Number of distinct vertices assigned to some group.
pub fn group_coverage(n: usize, groups: &[Vec<usize>]) -> Result<usize> {
    let mut covered = IndexSet::with_capacity(n);
    for group in groups {
        for &vertex in group {
            if vertex >= n {
                return Err(ClusteringError::vertex_out_of_range("group member", vertex, n));
            }
            covered.insert(vertex);
        }
    }
    Ok(covered.len())
}

pub fn ensure_full_coverage(n: usize, groups: &[Vec<usize>]) -> Result<()> {
    let covered = group_coverage(n, groups)?;
    if covered != n {
        return Err(ClusteringError::config(format!(
            "group fractions must sum to 1, but groups cover {covered} of {n} vertices"
        )));
    }
    Ok(())
}

fn null_space_with_rank(constraint: &DMatrix<f64>) -> Result<(DMatrix<f64>, usize)> {
    let n = constraint.nrows();
    if constraint.ncols() == 0 {
        return Ok((DMatrix::identity(n, n), 0));
    }
    if constraint.iter().any(|v| !v.is_finite()) {
        return Err(ClusteringError::LinearAlgebra(
            "constraint matrix contains non-finite entries".to_string(),
        ));
    }

    let svd = SVD::new(constraint.clone(), true, false);
    let u = svd.u.as_ref().ok_or_else(|| {
        ClusteringError::LinearAlgebra("SVD did not produce left singular vectors".to_string())
    })?;

    let largest = svd.singular_values.amax();
    let cutoff = f64::EPSILON * n.max(constraint.ncols()) as f64 * largest;
    let retained: Vec<_> = svd
        .singular_values
        .iter()
        .enumerate()
        .filter(|(_, sigma)| **sigma > cutoff)
        .map(|(idx, _)| u.column(idx).into_owned())
        .collect();
    let rank = retained.len();
    if rank == 0 {
        return Ok((DMatrix::identity(n, n), 0));
    }

    // The projector onto the complement of span(U_r) has eigenvalues exactly 0 (rank times)
    // and 1 (n - rank times).
    let range = DMatrix::from_columns(&retained);
    let projector = DMatrix::identity(n, n) - &range * range.transpose();
    let eigen = sorted_eigenpairs(&projector)?;
    let complement: Vec<_> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .filter(|(_, value)| **value > 0.5)
        .map(|(idx, _)| eigen.eigenvectors.column(idx).into_owned())
        .collect();

    if complement.len() + rank != n {
        return Err(ClusteringError::LinearAlgebra(format!(
            "null space extraction found {} directions for rank {} in dimension {}",
            complement.len(),
            rank,
            n
        )));
    }
    let basis = if complement.is_empty() {
        DMatrix::zeros(n, 0)
    } else {
        DMatrix::from_columns(&complement)
    };
    Ok((basis, rank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constraint_columns_are_centred_indicators() {
        let groups = vec![vec![0, 1], vec![2, 3, 4, 5]];
        let constraint = constraint_matrix(6, &groups).expect("constraint");
        assert_eq!(constraint.shape(), (6, 1));
        assert_abs_diff_eq!(constraint[(0, 0)], 1.0 - 2.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(constraint[(4, 0)], -2.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(constraint.column(0).sum(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn null_space_is_orthogonal_to_constraints() {
        let cases: Vec<(usize, Vec<Vec<usize>>)> = vec![
            (6, vec![vec![0, 1, 2], vec![3, 4, 5]]),
            (9, vec![vec![0, 3, 6], vec![1, 4, 7], vec![2, 5, 8]]),
            (10, vec![vec![0, 1, 2, 3], vec![4, 5], vec![6, 7, 8, 9]]),
            (7, vec![vec![0], vec![1, 2, 3, 4, 5, 6]]),
        ];
        for (n, groups) in cases {
            let projector = FairnessProjector::new(n, &groups).expect("projector");
            assert_eq!(projector.dimension(), n - groups.len() + 1);
            assert!(projector.residual() < 1e-8, "residual for n = {n}");

            let gram = projector.basis().transpose() * projector.basis();
            let identity = DMatrix::<f64>::identity(gram.nrows(), gram.ncols());
            assert!((gram - identity).amax() < 1e-8);
        }
    }

    #[test]
    fn single_group_leaves_full_space() {
        let projector = FairnessProjector::new(4, &[vec![0, 1, 2, 3]]).expect("projector");
        assert_eq!(projector.rank(), 0);
        assert_eq!(projector.dimension(), 4);
    }

    #[test]
    fn empty_groups_are_invalid() {
        assert!(matches!(
            constraint_matrix(3, &[]),
            Err(ClusteringError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn capacity_check_reports_dimension() {
        let groups = vec![vec![0], vec![1], vec![2], vec![3]];
        let projector = FairnessProjector::new(4, &groups).expect("projector");
        assert_eq!(projector.dimension(), 1);
        assert_eq!(
            projector.ensure_capacity(3),
            Err(ClusteringError::RankDeficiency {
                dimension: 1,
                required: 3
            })
        );
    }

    #[test]
    fn coverage_requirement() {
        assert!(ensure_full_coverage(4, &[vec![0, 1], vec![2, 3]]).is_ok());
        assert!(matches!(
            ensure_full_coverage(4, &[vec![0, 1], vec![2]]),
            Err(ClusteringError::InvalidConfiguration(_))
        ));
    }
}

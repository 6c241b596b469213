use indexmap::IndexSet;
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::error::{ClusteringError, Result};
use crate::graph::matrix::Edge;

/// Directed edges with exactly one endpoint inside `cluster`.
///
/// The edge list is not deduplicated: `(a, b)` and `(b, a)` crossing the boundary count twice.
pub fn cut_count(edges: &[Edge], cluster: &[usize]) -> usize {
    let members: IndexSet<usize> = cluster.iter().copied().collect();
    edges
        .iter()
        .filter(|(source, target)| members.contains(source) != members.contains(target))
        .count()
}

/// Cut count of every cluster in order.
pub fn cut_counts(edges: &[Edge], clusters: &[Vec<usize>]) -> Vec<usize> {
    clusters
        .par_iter()
        .map(|cluster| cut_count(edges, cluster))
        .collect()
}

/// k x h matrix whose (i, j) entry counts members of group j inside cluster i.
pub fn contingency(clusters: &[Vec<usize>], groups: &[Vec<usize>]) -> DMatrix<usize> {
    let group_sets: Vec<IndexSet<usize>> = groups
        .iter()
        .map(|group| group.iter().copied().collect())
        .collect();
    let mut matrix = DMatrix::zeros(clusters.len(), groups.len());
    for (i, cluster) in clusters.iter().enumerate() {
        for (j, group) in group_sets.iter().enumerate() {
            matrix[(i, j)] = cluster.iter().filter(|v| group.contains(*v)).count();
        }
    }
    matrix
}

/// `min(row) / max(row)`, or `None` when the row has no group members at all.
pub fn balance(row: &[usize]) -> Option<f64> {
    let max = row.iter().copied().max()?;
    if max == 0 {
        return None;
    }
    let min = row.iter().copied().min().unwrap_or_default();
    Some(min as f64 / max as f64)
}

/// Per-cluster balance for every row of a contingency matrix.
pub fn balances(contingency: &DMatrix<usize>) -> Vec<Option<f64>> {
    contingency
        .row_iter()
        .map(|row| balance(&row.iter().copied().collect::<Vec<_>>()))
        .collect()
}

/// k x k matrix of symmetric-difference sizes `|a_i Δ b_j|`.
pub fn misclassification(a: &[Vec<usize>], b: &[Vec<usize>]) -> Result<DMatrix<usize>> {
    if a.len() != b.len() {
        return Err(ClusteringError::shape(
            "misclassification part count",
            a.len(),
            b.len(),
        ));
    }
    let a_sets: Vec<IndexSet<usize>> = a.iter().map(|c| c.iter().copied().collect()).collect();
    let b_sets: Vec<IndexSet<usize>> = b.iter().map(|c| c.iter().copied().collect()).collect();

    let rows: Vec<Vec<usize>> = a_sets
        .par_iter()
        .map(|left| {
            b_sets
                .iter()
                .map(|right| left.symmetric_difference(right).count())
                .collect()
        })
        .collect();

    let k = a.len();
    Ok(DMatrix::from_fn(k, k, |i, j| rows[i][j]))
}

/// Minimum-cost one-to-one matching of rows to columns of a square cost matrix, as
/// `(row, column)` pairs sorted by row.
///
/// Potential-based Hungarian algorithm, O(k^3).
pub fn optimal_matching(cost: &DMatrix<usize>) -> Result<Vec<(usize, usize)>> {
    let n = cost.nrows();
    if cost.ncols() != n {
        return Err(ClusteringError::shape("matching cost columns", n, cost.ncols()));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let c = |i: usize, j: usize| cost[(i, j)] as i64;
    // Index 0 of the potentials and of `assigned` is a dummy source; rows and columns are
    // 1-indexed below.
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    let mut assigned = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        assigned[0] = row;
        let mut j0 = 0usize;
        let mut min_val = vec![i64::MAX; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = assigned[j0];
            let mut delta = i64::MAX;
            let mut j1 = 0usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = c(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < min_val[j] {
                    min_val[j] = reduced;
                    way[j] = j0;
                }
                if min_val[j] < delta {
                    delta = min_val[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[assigned[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_val[j] -= delta;
                }
            }
            j0 = j1;
            if assigned[j0] == 0 {
                break;
            }
        }

        loop {
            let previous = way[j0];
            assigned[j0] = assigned[previous];
            j0 = previous;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=n)
        .filter(|&j| assigned[j] != 0)
        .map(|j| (assigned[j] - 1, j - 1))
        .collect();
    pairs.sort_unstable();
    Ok(pairs)
}

/// Total symmetric difference under the best one-to-one matching of parts.
pub fn misclassification_error(matrix: &DMatrix<usize>) -> Result<usize> {
    Ok(optimal_matching(matrix)?
        .into_iter()
        .map(|(i, j)| matrix[(i, j)])
        .sum())
}

use std::time::{Duration, Instant};

use log::debug;
use nalgebra::DMatrix;

use crate::cluster::{KMeansConfig, Partition, RowClusterer};
use crate::error::{ClusteringError, Result};
use crate::fairness::{ensure_full_coverage, FairnessProjector};
use crate::graph::matrix::{build_adjacency, check_adjacency, Edge};
use crate::spectral::{EigenvectorCount, EmbeddingSolver, Normalization};

#[derive(Debug, Clone, Default)]
pub struct ClusteringConfig {
    pub eigenvectors: EigenvectorCount,
    pub kmeans: KMeansConfig,
    /// Reject group partitions that leave vertices unassigned.
    pub require_group_coverage: bool,
}

impl ClusteringConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            kmeans: KMeansConfig::seeded(seed),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusteringSummary {
    pub partition: Partition,
    pub embedding_width: usize,
    /// Dimension of the fairness subspace, for constrained runs.
    pub null_space_dimension: Option<usize>,
    pub duration: Duration,
}

/// Spectral clustering pipeline: Laplacian, optional fairness projection, eigensolve,
/// k-means rounding.
#[derive(Debug, Clone, Default)]
pub struct ClusteringWorkflow {
    config: ClusteringConfig,
}

impl ClusteringWorkflow {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn unconstrained(
        &self,
        n: usize,
        k: usize,
        edges: &[Edge],
        normalization: Normalization,
    ) -> Result<Partition> {
        let adjacency = build_adjacency(n, edges)?;
        self.run(n, k, &adjacency, None, normalization)
            .map(|summary| summary.partition)
    }

    pub fn fair(
        &self,
        n: usize,
        k: usize,
        edges: &[Edge],
        groups: &[Vec<usize>],
        normalization: Normalization,
    ) -> Result<Partition> {
        let adjacency = build_adjacency(n, edges)?;
        self.run(n, k, &adjacency, Some(groups), normalization)
            .map(|summary| summary.partition)
    }

    pub fn unconstrained_from_adjacency(
        &self,
        n: usize,
        k: usize,
        adjacency: &DMatrix<f64>,
        normalization: Normalization,
    ) -> Result<Partition> {
        self.run(n, k, adjacency, None, normalization)
            .map(|summary| summary.partition)
    }

    pub fn fair_from_adjacency(
        &self,
        n: usize,
        k: usize,
        adjacency: &DMatrix<f64>,
        groups: &[Vec<usize>],
        normalization: Normalization,
    ) -> Result<Partition> {
        self.run(n, k, adjacency, Some(groups), normalization)
            .map(|summary| summary.partition)
    }

    /// Runs the whole pipeline; `groups = None` is plain spectral clustering.
    pub fn run(
        &self,
        n: usize,
        k: usize,
        adjacency: &DMatrix<f64>,
        groups: Option<&[Vec<usize>]>,
        normalization: Normalization,
    ) -> Result<ClusteringSummary> {
        let start = Instant::now();
        check_adjacency(n, adjacency)?;
        validate_cluster_count(n, k)?;
        let width = self.config.eigenvectors.width(k);
        if width > n {
            return Err(ClusteringError::config(format!(
                "embedding width {width} exceeds vertex count {n}"
            )));
        }

        let (embedding, null_space_dimension) = match groups {
            None => {
                let solver = EmbeddingSolver::unconstrained(adjacency, normalization);
                (solver.embed(width)?, None)
            }
            Some(groups) => {
                if self.config.require_group_coverage {
                    ensure_full_coverage(n, groups)?;
                }
                let projector = FairnessProjector::new(n, groups)?;
                projector.ensure_capacity(width.max(k + 1))?;
                debug!(
                    "fairness residual max |F^T Z| = {:.3e}",
                    projector.residual()
                );
                let solver =
                    EmbeddingSolver::constrained(adjacency, projector.basis(), normalization);
                (solver.embed(width)?, Some(projector.dimension()))
            }
        };

        let partition = RowClusterer::new(self.config.kmeans.clone()).cluster(k, &embedding)?;
        let duration = start.elapsed();
        debug!(
            "{:?} {} run: n = {}, k = {}, width = {}, sizes = {:?}, took {:?}",
            normalization,
            if groups.is_some() { "fair" } else { "unconstrained" },
            n,
            k,
            width,
            partition.sizes(),
            duration
        );

        Ok(ClusteringSummary {
            partition,
            embedding_width: width,
            null_space_dimension,
            duration,
        })
    }
}

fn validate_cluster_count(n: usize, k: usize) -> Result<()> {
    if k == 0 {
        return Err(ClusteringError::config("number of clusters must be positive"));
    }
    if k >= n {
        return Err(ClusteringError::config(format!(
            "number of clusters {k} must be smaller than the vertex count {n}"
        )));
    }
    Ok(())
}

pub fn unconstrained_cluster(
    n: usize,
    k: usize,
    edges: &[Edge],
    normalized: bool,
) -> Result<Partition> {
    ClusteringWorkflow::default().unconstrained(n, k, edges, Normalization::from_flag(normalized))
}

pub fn fair_cluster(
    n: usize,
    k: usize,
    edges: &[Edge],
    groups: &[Vec<usize>],
    normalized: bool,
) -> Result<Partition> {
    ClusteringWorkflow::default().fair(n, k, edges, groups, Normalization::from_flag(normalized))
}

pub fn unconstrained_cluster_from_adjacency(
    n: usize,
    k: usize,
    adjacency: &DMatrix<f64>,
    normalized: bool,
) -> Result<Partition> {
    ClusteringWorkflow::default().unconstrained_from_adjacency(
        n,
        k,
        adjacency,
        Normalization::from_flag(normalized),
    )
}

pub fn fair_cluster_from_adjacency(
    n: usize,
    k: usize,
    adjacency: &DMatrix<f64>,
    groups: &[Vec<usize>],
    normalized: bool,
) -> Result<Partition> {
    ClusteringWorkflow::default().fair_from_adjacency(
        n,
        k,
        adjacency,
        groups,
        Normalization::from_flag(normalized),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_cluster_count_not_below_vertex_count() {
        let workflow = ClusteringWorkflow::new(ClusteringConfig::seeded(1));
        let err = workflow
            .unconstrained(3, 3, &[(0, 1), (1, 0)], Normalization::Unnormalized)
            .expect_err("k >= n");
        assert!(matches!(err, ClusteringError::InvalidConfiguration(_)));
    }

    #[test]
    fn plus_one_mode_widens_embedding() {
        let edges = vec![(0, 1), (1, 0), (1, 2), (2, 1), (3, 4), (4, 3), (4, 5), (5, 4)];
        let adjacency = build_adjacency(6, &edges).expect("adjacency");
        let config = ClusteringConfig {
            eigenvectors: EigenvectorCount::ClustersPlusOne,
            ..ClusteringConfig::seeded(3)
        };
        let summary = ClusteringWorkflow::new(config)
            .run(6, 2, &adjacency, None, Normalization::Unnormalized)
            .expect("run");
        assert_eq!(summary.embedding_width, 3);
        assert_eq!(summary.partition.len(), 2);
        assert!(summary.null_space_dimension.is_none());
    }

    #[test]
    fn fair_run_reports_null_space_dimension() {
        let edges = vec![(0, 1), (1, 0), (1, 2), (2, 1), (2, 3), (3, 2), (3, 0), (0, 3)];
        let adjacency = build_adjacency(4, &edges).expect("adjacency");
        let groups = vec![vec![0, 2], vec![1, 3]];
        let summary = ClusteringWorkflow::new(ClusteringConfig::seeded(5))
            .run(4, 2, &adjacency, Some(&groups), Normalization::Unnormalized)
            .expect("run");
        assert_eq!(summary.null_space_dimension, Some(3));
    }

    #[test]
    fn too_many_groups_is_rank_deficient() {
        let edges: Vec<Edge> = (0..4)
            .flat_map(|i| [(i, (i + 1) % 4), ((i + 1) % 4, i)])
            .collect();
        let groups = vec![vec![0], vec![1], vec![2], vec![3]];
        let err = ClusteringWorkflow::default()
            .fair(4, 2, &edges, &groups, Normalization::Unnormalized)
            .expect_err("rank deficiency");
        assert_eq!(
            err,
            ClusteringError::RankDeficiency {
                dimension: 1,
                required: 3
            }
        );
    }

    #[test]
    fn coverage_requirement_is_enforced_when_configured() {
        let edges = vec![(0, 1), (1, 0), (1, 2), (2, 1), (2, 3), (3, 2)];
        let groups = vec![vec![0, 1], vec![2]];
        let config = ClusteringConfig {
            require_group_coverage: true,
            ..ClusteringConfig::seeded(2)
        };
        let err = ClusteringWorkflow::new(config)
            .fair(4, 2, &edges, &groups, Normalization::Unnormalized)
            .expect_err("coverage");
        assert!(matches!(err, ClusteringError::InvalidConfiguration(_)));
    }
}

use serde::Serialize;

use crate::cluster::Partition;
use crate::error::Result;
use crate::graph::matrix::Edge;
use crate::metrics::{balances, contingency, cut_counts, misclassification, misclassification_error};

/// Every evaluation metric for one partition, in a serializable form.
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub sizes: Vec<usize>,
    pub cuts: Vec<usize>,
    pub total_cut: usize,
    pub contingency: Vec<Vec<usize>>,
    pub balances: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misclassification: Option<Vec<Vec<usize>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misclassification_error: Option<usize>,
}

impl ClusteringReport {
    pub fn evaluate(
        partition: &Partition,
        edges: &[Edge],
        groups: &[Vec<usize>],
        reference: Option<&[Vec<usize>]>,
    ) -> Result<Self> {
        let clusters = partition.clusters();
        let cuts = cut_counts(edges, clusters);
        let table = contingency(clusters, groups);

        let (misclassification, misclassification_error) = match reference {
            Some(reference) => {
                let matrix = misclassification(clusters, reference)?;
                let error = misclassification_error(&matrix)?;
                (Some(rows(&matrix)), Some(error))
            }
            None => (None, None),
        };

        Ok(Self {
            sizes: partition.sizes(),
            total_cut: cuts.iter().sum(),
            cuts,
            balances: balances(&table),
            contingency: rows(&table),
            misclassification,
            misclassification_error,
        })
    }

    /// Smallest defined per-cluster balance.
    pub fn min_balance(&self) -> Option<f64> {
        self.balances
            .iter()
            .flatten()
            .copied()
            .min_by(|a, b| a.total_cmp(b))
    }
}

fn rows(matrix: &nalgebra::DMatrix<usize>) -> Vec<Vec<usize>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

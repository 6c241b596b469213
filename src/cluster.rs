use std::cmp::Ordering;

use log::{debug, warn};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ClusteringError, Result};

/// Relative deviation below which a column counts as constant.
const ZERO_DEVIATION: f64 = 1e-10;

/// Ordered sequence of k index sets. Sets may be empty when rounding leaves a centroid unused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub clusters: Vec<Vec<usize>>,
}

impl Partition {
    pub fn new(clusters: Vec<Vec<usize>>) -> Self {
        Self { clusters }
    }

    /// Groups row indices by label; labels must be `< k`.
    pub fn from_labels(k: usize, labels: &[usize]) -> Result<Self> {
        let mut clusters = vec![Vec::new(); k];
        for (row, &label) in labels.iter().enumerate() {
            let cluster = clusters
                .get_mut(label)
                .ok_or_else(|| ClusteringError::shape("cluster label", k, label))?;
            cluster.push(row);
        }
        Ok(Self { clusters })
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(Vec::len).collect()
    }

    pub fn empty_clusters(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_empty()).count()
    }

    pub fn clusters(&self) -> &[Vec<usize>] {
        &self.clusters
    }

    pub fn into_clusters(self) -> Vec<Vec<usize>> {
        self.clusters
    }
}

#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    /// Stop once the mean centroid distance improves by no more than this.
    pub tolerance: f64,
    /// Independent k-means++ initializations; the lowest-distortion run wins.
    pub restarts: usize,
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-5,
            restarts: 20,
            seed: None,
        }
    }
}

impl KMeansConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// Rounds embedding rows into k clusters with whitened k-means.
#[derive(Debug, Clone, Default)]
pub struct RowClusterer {
    config: KMeansConfig,
}

impl RowClusterer {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn cluster(&self, k: usize, embedding: &DMatrix<f64>) -> Result<Partition> {
        let rows = embedding.nrows();
        if k == 0 {
            return Err(ClusteringError::config("number of clusters must be positive"));
        }
        if k > rows {
            return Err(ClusteringError::config(format!(
                "cannot form {k} clusters from {rows} rows"
            )));
        }
        if embedding.ncols() == 0 {
            return Err(ClusteringError::config("embedding has no columns"));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(ClusteringError::LinearAlgebra(
                "embedding contains non-finite entries".to_string(),
            ));
        }

        let whitened = whiten(embedding);
        let points: Vec<Vec<f64>> = whitened
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();

        let base_seed = self.config.seed.unwrap_or_else(random_seed);
        let restarts = self.config.restarts.max(1);
        let best = (0..restarts)
            .into_par_iter()
            .map(|restart| {
                let mut rng =
                    Xoshiro256PlusPlus::seed_from_u64(base_seed.wrapping_add(restart as u64));
                let initial = kmeans_plus_plus(&points, k, &mut rng);
                let run = lloyd(&points, initial, &self.config);
                (restart, run)
            })
            .min_by(|(ra, a), (rb, b)| {
                a.distortion
                    .partial_cmp(&b.distortion)
                    .unwrap_or(Ordering::Equal)
                    .then(ra.cmp(rb))
            })
            .map(|(_, run)| run)
            .ok_or_else(|| ClusteringError::config("k-means produced no runs"))?;

        debug!(
            "k-means: k = {}, rows = {}, dims = {}, iterations = {}, distortion = {:.6}",
            k,
            rows,
            whitened.ncols(),
            best.iterations,
            best.distortion
        );

        let labels: Vec<usize> = points
            .par_iter()
            .map(|point| nearest(point, &best.centroids).0)
            .collect();
        let partition = Partition::from_labels(k, &labels)?;
        if partition.empty_clusters() > 0 {
            debug!(
                "k-means rounding left {} of {} clusters empty",
                partition.empty_clusters(),
                k
            );
        }
        Ok(partition)
    }
}

/// Scales every column to unit population standard deviation.
///
/// Columns with zero deviation, up to rounding relative to their magnitude, are left as they
/// are.
pub fn whiten(rows: &DMatrix<f64>) -> DMatrix<f64> {
    let mut whitened = rows.clone();
    let count = rows.nrows().max(1) as f64;
    for (idx, mut column) in whitened.column_iter_mut().enumerate() {
        let mean = column.sum() / count;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
        let std_dev = variance.sqrt();
        if std_dev <= ZERO_DEVIATION * column.amax() {
            warn!("embedding column {} has zero deviation; left unscaled", idx);
            continue;
        }
        column.iter_mut().for_each(|v| *v /= std_dev);
    }
    whitened
}

struct KMeansRun {
    centroids: Vec<Vec<f64>>,
    distortion: f64,
    iterations: usize,
}

fn kmeans_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    let mut min_dists: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_dists.iter().sum();
        let chosen = if total <= 0.0 {
            rng.gen_range(0..points.len())
        } else {
            let threshold = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            min_dists
                .iter()
                .position(|d| {
                    cumulative += d;
                    cumulative >= threshold
                })
                .unwrap_or(points.len() - 1)
        };

        let centroid = points[chosen].clone();
        for (dist, point) in min_dists.iter_mut().zip(points) {
            *dist = dist.min(squared_distance(point, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, config: &KMeansConfig) -> KMeansRun {
    let dims = points.first().map(Vec::len).unwrap_or_default();
    let mut previous = f64::INFINITY;
    let mut distortion = f64::INFINITY;
    let mut iterations = 0;

    while iterations < config.max_iterations.max(1) {
        iterations += 1;

        let assignments: Vec<(usize, f64)> =
            points.iter().map(|p| nearest(p, &centroids)).collect();
        distortion = assignments.iter().map(|(_, d)| d.sqrt()).sum::<f64>() / points.len() as f64;

        let mut sums = vec![vec![0.0; dims]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (point, (label, _)) in points.iter().zip(&assignments) {
            counts[*label] += 1;
            for (acc, value) in sums[*label].iter_mut().zip(point) {
                *acc += value;
            }
        }
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
            // Empty clusters keep their previous centroid.
            if count > 0 {
                *centroid = sum.into_iter().map(|v| v / count as f64).collect();
            }
        }

        if previous - distortion <= config.tolerance {
            break;
        }
        previous = distortion;
    }

    KMeansRun {
        centroids,
        distortion,
        iterations,
    }
}

/// Index and squared distance of the closest centroid; ties go to the lowest index.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    best
}

fn squared_distance(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| (l - r) * (l - r))
        .sum()
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::debug;
use nalgebra::DMatrix;

use crate::graph::matrix::{build_adjacency, edges_from_adjacency, symmetrize};
use crate::graph::model::{ClusteringProblem, GraphInput, RawProblem};

/// Turns JSON problem descriptions into in-memory clustering problems.
#[derive(Debug, Default)]
pub struct ProblemLoader;

impl ProblemLoader {
    pub fn from_json_str(json: &str) -> Result<ClusteringProblem> {
        let raw: RawProblem = serde_json::from_str(json)?;
        Self::from_raw_problem(raw)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<ClusteringProblem> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn from_path(path: &Path) -> Result<ClusteringProblem> {
        let file = File::open(path).with_context(|| format!("open problem file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("parse problem file {:?}", path))
    }

    pub fn from_raw_problem(raw: RawProblem) -> Result<ClusteringProblem> {
        let n = raw.vertex_count;
        if n == 0 {
            return Err(anyhow!("Problem must declare at least one vertex"));
        }

        let input = match raw.adjacency {
            Some(rows) => GraphInput::Adjacency(adjacency_from_rows(n, &rows)?),
            None => GraphInput::Edges(raw.edges),
        };

        let input = match (raw.symmetrize, input) {
            (Some(mode), GraphInput::Adjacency(adjacency)) => {
                GraphInput::Adjacency(symmetrize(&adjacency, mode)?)
            }
            (Some(mode), GraphInput::Edges(edges)) => {
                let adjacency = build_adjacency(n, &edges)?;
                GraphInput::Edges(edges_from_adjacency(&symmetrize(&adjacency, mode)?))
            }
            (None, input) => input,
        };

        let edges = match &input {
            GraphInput::Edges(edges) => {
                if let Some(&(s, t)) = edges.iter().find(|(s, t)| *s >= n || *t >= n) {
                    return Err(anyhow!(
                        "Edge ({s}, {t}) references a vertex outside [0, {n})"
                    ));
                }
                edges.clone()
            }
            GraphInput::Adjacency(adjacency) => edges_from_adjacency(adjacency),
        };

        for (idx, group) in raw.groups.iter().enumerate() {
            if let Some(vertex) = group.iter().find(|v| **v >= n) {
                return Err(anyhow!(
                    "Group {idx} references vertex {vertex} outside [0, {n})"
                ));
            }
        }

        debug!(
            "Loaded problem: {} vertices, {} edges, {} groups, k = {}",
            n,
            edges.len(),
            raw.groups.len(),
            raw.clusters
        );

        Ok(ClusteringProblem {
            vertex_count: n,
            clusters: raw.clusters,
            input,
            edges,
            groups: raw.groups,
            reference: raw.reference,
        })
    }
}

fn adjacency_from_rows(n: usize, rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    if rows.len() != n {
        return Err(anyhow!(
            "Adjacency has {} rows, expected {}",
            rows.len(),
            n
        ));
    }
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n) {
        return Err(anyhow!(
            "Adjacency row {idx} has {} entries, expected {n}",
            row.len()
        ));
    }
    Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
}

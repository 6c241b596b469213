use approx::assert_abs_diff_eq;
use fairsc::fairness::FairnessProjector;
use fairsc::graph::build_adjacency;
use fairsc::{
    ClusteringConfig, ClusteringError, ClusteringReport, ClusteringWorkflow, Edge, Normalization,
    Partition,
};

fn undirected(pairs: &[(usize, usize)]) -> Vec<Edge> {
    pairs.iter().flat_map(|&(a, b)| [(a, b), (b, a)]).collect()
}

fn sorted_clusters(partition: &Partition) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = partition
        .clusters()
        .iter()
        .map(|cluster| {
            let mut cluster = cluster.clone();
            cluster.sort_unstable();
            cluster
        })
        .collect();
    clusters.sort();
    clusters
}

/// Two `size`-cliques, one per group, joined by a perfect matching. The cheapest cut separates
/// the groups; the fairness subspace forces every vertex to share a cluster with its partner.
fn cliques_joined_by_matching(size: usize) -> (Vec<Edge>, Vec<Vec<usize>>) {
    let mut pairs = Vec::new();
    for offset in [0, size] {
        for a in 0..size {
            for b in (a + 1)..size {
                pairs.push((offset + a, offset + b));
            }
        }
    }
    for v in 0..size {
        pairs.push((v, v + size));
    }
    let groups = vec![(0..size).collect(), (size..2 * size).collect()];
    (undirected(&pairs), groups)
}

#[test]
fn disjoint_pairs_split_into_components() {
    let edges = undirected(&[(0, 1), (2, 3)]);
    for normalization in [Normalization::Unnormalized, Normalization::Normalized] {
        let partition = ClusteringWorkflow::new(ClusteringConfig::seeded(11))
            .unconstrained(4, 2, &edges, normalization)
            .expect("clustering");
        assert_eq!(sorted_clusters(&partition), vec![vec![0, 1], vec![2, 3]]);
    }
}

#[test]
fn fair_clustering_improves_balance() {
    for (size, normalization) in [
        (3, Normalization::Unnormalized),
        (3, Normalization::Normalized),
        (4, Normalization::Unnormalized),
        (4, Normalization::Normalized),
    ] {
        let (edges, groups) = cliques_joined_by_matching(size);
        let n = 2 * size;
        let workflow = ClusteringWorkflow::new(ClusteringConfig::seeded(42));
        let plain = workflow
            .unconstrained(n, 2, &edges, normalization)
            .expect("unconstrained");
        let fair = workflow
            .fair(n, 2, &edges, &groups, normalization)
            .expect("fair");

        let plain_report =
            ClusteringReport::evaluate(&plain, &edges, &groups, None).expect("plain report");
        let fair_report =
            ClusteringReport::evaluate(&fair, &edges, &groups, None).expect("fair report");

        assert_eq!(sorted_clusters(&plain), groups);
        assert_eq!(plain_report.min_balance(), Some(0.0));

        let fair_balance = fair_report.min_balance().expect("fair balance");
        assert!(fair_balance >= 0.5, "fair balance {fair_balance}");
        assert!(fair_balance > plain_report.min_balance().unwrap_or(0.0));
        for v in 0..size {
            let owner = fair
                .clusters()
                .iter()
                .position(|cluster| cluster.contains(&v))
                .expect("assigned");
            assert!(fair.clusters()[owner].contains(&(v + size)));
        }
    }
}

#[test]
fn every_vertex_is_assigned_exactly_once() {
    let (edges, groups) = cliques_joined_by_matching(4);
    let partition = ClusteringWorkflow::new(ClusteringConfig::seeded(3))
        .fair(8, 3, &edges, &groups, Normalization::Unnormalized)
        .expect("fair");
    assert_eq!(partition.len(), 3);
    let mut seen: Vec<usize> = partition.clusters().iter().flatten().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
}

#[test]
fn isolated_vertex_breaks_normalized_variants() {
    let edges = undirected(&[(0, 1), (1, 2), (2, 0), (3, 4)]);
    let workflow = ClusteringWorkflow::new(ClusteringConfig::seeded(1));

    let err = workflow
        .unconstrained(6, 2, &edges, Normalization::Normalized)
        .expect_err("isolated vertex");
    assert_eq!(err, ClusteringError::DegenerateDegree { vertex: 5 });

    let partition = workflow
        .unconstrained(6, 2, &edges, Normalization::Unnormalized)
        .expect("unnormalized tolerates isolated vertices");
    assert_eq!(partition.len(), 2);
}

#[test]
fn fairness_basis_annihilates_constraints() {
    let groups = vec![vec![0, 3, 6, 9], vec![1, 4, 7], vec![2, 5, 8]];
    let projector = FairnessProjector::new(10, &groups).expect("projector");
    assert_eq!(projector.rank(), 2);
    assert_eq!(projector.dimension(), 8);
    assert!(projector.residual() < 1e-8);

    let gram = projector.basis().transpose() * projector.basis();
    for i in 0..gram.nrows() {
        for j in 0..gram.ncols() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(gram[(i, j)], expected, epsilon = 1e-8);
        }
    }
}

#[test]
fn adjacency_entry_point_matches_edge_entry_point() {
    let (edges, groups) = cliques_joined_by_matching(4);
    let adjacency = build_adjacency(8, &edges).expect("adjacency");
    let workflow = ClusteringWorkflow::new(ClusteringConfig::seeded(9));

    let from_edges = workflow
        .fair(8, 2, &edges, &groups, Normalization::Unnormalized)
        .expect("edges");
    let from_adjacency = workflow
        .fair_from_adjacency(8, 2, &adjacency, &groups, Normalization::Unnormalized)
        .expect("adjacency");
    assert_eq!(sorted_clusters(&from_edges), sorted_clusters(&from_adjacency));
}

#[test]
fn seeded_runs_are_reproducible() {
    let (edges, _) = cliques_joined_by_matching(4);
    let run = || {
        ClusteringWorkflow::new(ClusteringConfig::seeded(2024))
            .unconstrained(8, 3, &edges, Normalization::Unnormalized)
            .expect("clustering")
    };
    assert_eq!(run().clusters(), run().clusters());
}

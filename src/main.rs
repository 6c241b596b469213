use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use nalgebra::DMatrix;
use serde::Serialize;

use fairsc::graph::build_adjacency;
use fairsc::{
    ClusteringConfig, ClusteringProblem, ClusteringReport, ClusteringWorkflow, EigenvectorCount,
    GraphInput, Normalization, Partition, ProblemLoader,
};

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

struct CliArgs {
    problem: PathBuf,
    seed: Option<u64>,
    plus_one: bool,
}

fn parse_args() -> Result<CliArgs> {
    let mut args = env::args().skip(1);
    let mut problem = None;
    let mut seed = None;
    let mut plus_one = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let value = args.next().context("--seed expects a value")?;
                seed = Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("parse seed {value:?}"))?,
                );
            }
            "--plus-one" => plus_one = true,
            _ if problem.is_none() => problem = Some(PathBuf::from(arg)),
            _ => bail!("Unexpected extra argument: {arg}"),
        }
    }

    let Some(problem) = problem else {
        bail!("Usage: fairsc <problem.json> [--seed N] [--plus-one]");
    };
    Ok(CliArgs {
        problem,
        seed,
        plus_one,
    })
}

#[derive(Serialize)]
struct RunOutput {
    variant: &'static str,
    embedding_width: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    null_space_dimension: Option<usize>,
    duration_ms: f64,
    partition: Partition,
    report: ClusteringReport,
}

#[derive(Serialize)]
struct Output {
    vertex_count: usize,
    clusters: usize,
    edges: usize,
    groups: usize,
    components: usize,
    runs: Vec<RunOutput>,
}

fn main() -> Result<()> {
    init_logging();
    let args = parse_args()?;

    let problem = ProblemLoader::from_path(&args.problem)
        .with_context(|| format!("load clustering problem {:?}", args.problem))?;
    let components = problem.component_count();
    info!(
        "Problem {:?}: {} vertices, {} edges, {} groups, {} components, k = {}",
        args.problem,
        problem.vertex_count,
        problem.edge_count(),
        problem.group_count(),
        components,
        problem.clusters
    );

    let mut config = ClusteringConfig::default();
    config.kmeans.seed = args.seed;
    if args.plus_one {
        config.eigenvectors = EigenvectorCount::ClustersPlusOne;
    }
    let workflow = ClusteringWorkflow::new(config);

    let adjacency = match &problem.input {
        GraphInput::Adjacency(adjacency) => adjacency.clone(),
        GraphInput::Edges(edges) => build_adjacency(problem.vertex_count, edges)
            .context("build adjacency matrix from edge list")?,
    };

    let variants = [
        ("unnormalized", Normalization::Unnormalized, false),
        ("normalized", Normalization::Normalized, false),
        ("fair unnormalized", Normalization::Unnormalized, true),
        ("fair normalized", Normalization::Normalized, true),
    ];

    let mut runs = Vec::with_capacity(variants.len());
    for (variant, normalization, constrained) in variants {
        if constrained && problem.groups.is_empty() {
            warn!("Variant {}: skipped, problem declares no groups", variant);
            continue;
        }
        match run_variant(&workflow, &problem, &adjacency, normalization, constrained, variant) {
            Ok(run) => runs.push(run),
            Err(err) => warn!("Variant {}: failed: {:#}", variant, err),
        }
    }

    if runs.is_empty() {
        bail!("No clustering variant succeeded for {:?}", args.problem);
    }

    let output = Output {
        vertex_count: problem.vertex_count,
        clusters: problem.clusters,
        edges: problem.edge_count(),
        groups: problem.group_count(),
        components,
        runs,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("serialize clustering output")?
    );
    Ok(())
}

fn run_variant(
    workflow: &ClusteringWorkflow,
    problem: &ClusteringProblem,
    adjacency: &DMatrix<f64>,
    normalization: Normalization,
    constrained: bool,
    variant: &'static str,
) -> Result<RunOutput> {
    let groups = constrained.then_some(problem.groups.as_slice());
    let summary = workflow.run(
        problem.vertex_count,
        problem.clusters,
        adjacency,
        groups,
        normalization,
    )?;
    let report = ClusteringReport::evaluate(
        &summary.partition,
        &problem.edges,
        &problem.groups,
        problem.reference.as_deref(),
    )?;

    info!(
        "Variant {}: sizes {:?}, total cut {}, min balance {}, misclassification error {}, took {:?}",
        variant,
        report.sizes,
        report.total_cut,
        report
            .min_balance()
            .map(|b| format!("{b:.3}"))
            .unwrap_or_else(|| "n/a".to_string()),
        report
            .misclassification_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "n/a".to_string()),
        summary.duration
    );

    Ok(RunOutput {
        variant,
        embedding_width: summary.embedding_width,
        null_space_dimension: summary.null_space_dimension,
        duration_ms: summary.duration.as_secs_f64() * 1_000.0,
        partition: summary.partition,
        report,
    })
}

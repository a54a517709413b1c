//! Reporting: console table, CSV assignments, JSON visualization payload.
//!
//! The JSON payload carries everything an external renderer needs to
//! paint the decision regions, overlay the company points and mark the
//! centroids; this crate never rasterizes an image itself.

use crate::application::analysis::ClusteringOutcome;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Prints the cluster assignment table sorted by cluster, then name.
pub fn print_results_table(outcome: &ClusteringOutcome) {
    let mut rows = outcome.assignments.clone();
    rows.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.name.cmp(&b.name)));

    println!("\n{}", "=".repeat(56));
    println!(
        "Clustering results ({} companies, {} trading days)",
        rows.len(),
        outcome.n_days
    );
    println!("{}", "=".repeat(56));
    println!("{:<8} | {:<28} | {:<8}", "Cluster", "Company", "Symbol");
    println!("{}", "-".repeat(56));
    for row in &rows {
        println!("{:<8} | {:<28} | {:<8}", row.label, row.name, row.symbol);
    }
    println!("{}\n", "=".repeat(56));

    if !outcome.converged {
        println!("note: k-means hit the iteration limit before converging\n");
    }
}

/// Writes the assignment table to a CSV file.
pub fn write_assignments_csv(outcome: &ClusteringOutcome, path: &Path) -> Result<()> {
    let mut rows = outcome.assignments.clone();
    rows.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.name.cmp(&b.name)));

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    writer
        .write_record(["cluster", "company", "symbol"])
        .context("Failed to write CSV header")?;
    for row in &rows {
        writer
            .write_record([row.label.to_string(), row.name.clone(), row.symbol.clone()])
            .context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// One plotted company point in reduced space.
#[derive(Debug, Serialize)]
struct PointPayload {
    name: String,
    symbol: String,
    label: usize,
    x: f64,
    y: f64,
}

/// Visualization payload consumed by an external plot renderer.
#[derive(Debug, Serialize)]
struct VisualizationPayload<'a> {
    points: Vec<PointPayload>,
    /// `[x, y]` per centroid, indexed by cluster label.
    centroids: Vec<[f64; 2]>,
    grid: &'a crate::application::boundary::BoundaryGrid,
}

/// Writes the full visualization payload (points, centroids, label grid
/// with extent) as pretty-printed JSON.
pub fn write_visualization_json(outcome: &ClusteringOutcome, path: &Path) -> Result<()> {
    let points = outcome
        .assignments
        .iter()
        .enumerate()
        .map(|(i, a)| PointPayload {
            name: a.name.clone(),
            symbol: a.symbol.clone(),
            label: a.label,
            x: outcome.reduced[[i, 0]],
            y: outcome.reduced[[i, 1]],
        })
        .collect();

    let centroids = (0..outcome.centroids.nrows())
        .map(|c| [outcome.centroids[[c, 0]], outcome.centroids[[c, 1]]])
        .collect();

    let payload = VisualizationPayload {
        points,
        centroids,
        grid: &outcome.boundary,
    };

    let json = serde_json::to_string_pretty(&payload)
        .context("Failed to serialize visualization payload")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write visualization payload: {}", path.display()))?;
    Ok(())
}

//! End-to-end clustering scenarios over the in-memory data source.

use chrono::NaiveDate;
use stock_clusters::application::analysis::ClusterAnalysis;
use stock_clusters::config::AnalysisConfig;
use stock_clusters::domain::types::{Company, DailyBar};
use stock_clusters::infrastructure::mock::MockDataSource;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

const TRADING_DAYS: [&str; 5] = [
    "2015-01-02",
    "2015-01-05",
    "2015-01-06",
    "2015-01-07",
    "2015-01-08",
];

/// Bars whose close-minus-open equals the given movements, one per
/// trading day, around a flat 100.0 open.
fn bars_with_movements(movements: &[f64]) -> Vec<DailyBar> {
    movements
        .iter()
        .zip(TRADING_DAYS.iter())
        .map(|(&m, d)| DailyBar {
            date: date(d),
            open: 100.0,
            high: 100.0 + m.abs(),
            low: 100.0 - m.abs(),
            close: 100.0 + m,
            volume: 10_000.0,
        })
        .collect()
}

fn config(companies: Vec<Company>, n_clusters: usize) -> AnalysisConfig {
    AnalysisConfig {
        companies,
        start: date("2015-01-01"),
        end: date("2015-01-09"),
        n_clusters,
        n_components: 2,
        max_iterations: 1000,
        seed: 42,
    }
}

fn four_opposing_companies() -> (MockDataSource, Vec<Company>) {
    let up = [1.0, -1.0, 2.0, -2.0, 1.0];
    let down = [-1.0, 1.0, -2.0, 2.0, -1.0];
    let source = MockDataSource::new()
        .with_bars("AAA", bars_with_movements(&up))
        .with_bars("BBB", bars_with_movements(&up))
        .with_bars("CCC", bars_with_movements(&down))
        .with_bars("DDD", bars_with_movements(&down));
    let companies = vec![
        Company::new("Alpha", "AAA"),
        Company::new("Beta", "BBB"),
        Company::new("Gamma", "CCC"),
        Company::new("Delta", "DDD"),
    ];
    (source, companies)
}

#[tokio::test]
async fn opposite_movers_split_into_two_clusters() {
    let (source, companies) = four_opposing_companies();
    let analysis = ClusterAnalysis::new(&source, config(companies, 2)).unwrap();
    let outcome = analysis.run().await.unwrap();

    assert_eq!(outcome.assignments.len(), 4);
    let labels: Vec<usize> = outcome.assignments.iter().map(|a| a.label).collect();
    assert_eq!(labels[0], labels[1], "identical movers must share a cluster");
    assert_eq!(labels[2], labels[3], "identical movers must share a cluster");
    assert_ne!(labels[0], labels[2], "opposite movers must split");
    assert!(outcome.converged);
}

#[tokio::test]
async fn repeated_runs_with_same_seed_are_identical() {
    let (source, companies) = four_opposing_companies();

    let first = ClusterAnalysis::new(&source, config(companies.clone(), 2))
        .unwrap()
        .run()
        .await
        .unwrap();
    let second = ClusterAnalysis::new(&source, config(companies, 2))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(first.assignments, second.assignments);
    assert_eq!(first.centroids, second.centroids);
    assert_eq!(first.boundary.labels, second.boundary.labels);
}

#[tokio::test]
async fn missing_ticker_is_excluded_and_run_continues() {
    let (source, mut companies) = four_opposing_companies();
    // Fifth requested ticker has no data at all.
    companies.push(Company::new("Ghost", "GONE"));

    let analysis = ClusterAnalysis::new(&source, config(companies, 2)).unwrap();
    let outcome = analysis.run().await.unwrap();

    assert_eq!(outcome.assignments.len(), 4, "ghost ticker must be dropped");
    assert!(outcome.assignments.iter().all(|a| a.symbol != "GONE"));
}

#[tokio::test]
async fn failing_ticker_is_excluded_and_run_continues() {
    let (source, mut companies) = four_opposing_companies();
    let source = source.with_failure("BOOM");
    companies.push(Company::new("Boom Corp", "BOOM"));

    let analysis = ClusterAnalysis::new(&source, config(companies, 2)).unwrap();
    let outcome = analysis.run().await.unwrap();

    assert_eq!(outcome.assignments.len(), 4);
    assert!(outcome.assignments.iter().all(|a| a.symbol != "BOOM"));
}

#[tokio::test]
async fn all_missing_fails_with_no_data_error() {
    let source = MockDataSource::new();
    let companies = vec![
        Company::new("Alpha", "AAA"),
        Company::new("Beta", "BBB"),
    ];

    let analysis = ClusterAnalysis::new(&source, config(companies, 2)).unwrap();
    let err = analysis.run().await.unwrap_err();
    assert!(
        err.to_string().contains("movement matrix")
            || format!("{:?}", err).contains("NoUsableData"),
        "expected a no-data failure, got: {:?}",
        err
    );
}

#[tokio::test]
async fn bad_configuration_fails_at_construction() {
    let (source, companies) = four_opposing_companies();

    let mut bad = config(companies.clone(), 0);
    assert!(ClusterAnalysis::new(&source, bad.clone()).is_err());

    bad = config(companies.clone(), 2);
    bad.end = bad.start;
    assert!(ClusterAnalysis::new(&source, bad).is_err());

    // More clusters than companies in the universe.
    let bad = config(companies, 5);
    assert!(ClusterAnalysis::new(&source, bad).is_err());
}

#[tokio::test]
async fn boundary_grid_agrees_with_centroid_labels() {
    let (source, companies) = four_opposing_companies();
    let analysis = ClusterAnalysis::new(&source, config(companies, 2)).unwrap();
    let outcome = analysis.run().await.unwrap();

    // The grid cell nearest each centroid must carry that centroid's label.
    for c in 0..outcome.centroids.nrows() {
        let x = outcome.centroids[[c, 0]];
        let y = outcome.centroids[[c, 1]];
        let label = outcome
            .boundary
            .label_near(x, y)
            .expect("centroids lie inside the padded grid extent");
        assert_eq!(label, c, "grid disagrees with centroid {}", c);
    }
}

#[tokio::test]
async fn reduced_coordinates_are_two_dimensional_per_company() {
    let (source, companies) = four_opposing_companies();
    let analysis = ClusterAnalysis::new(&source, config(companies, 2)).unwrap();
    let outcome = analysis.run().await.unwrap();

    assert_eq!(outcome.reduced.dim(), (4, 2));
    assert_eq!(outcome.centroids.ncols(), 2);
    assert_eq!(outcome.n_days, TRADING_DAYS.len());
    assert!(outcome.reduced.iter().all(|v| v.is_finite()));
}

#[tokio::test]
async fn report_files_are_written() {
    use stock_clusters::application::reporting;

    let (source, companies) = four_opposing_companies();
    let analysis = ClusterAnalysis::new(&source, config(companies, 2)).unwrap();
    let outcome = analysis.run().await.unwrap();

    let dir = std::env::temp_dir().join("stock_clusters_test_reports");
    std::fs::create_dir_all(&dir).unwrap();
    let csv_path = dir.join("assignments.csv");
    let json_path = dir.join("payload.json");

    reporting::write_assignments_csv(&outcome, &csv_path).unwrap();
    reporting::write_visualization_json(&outcome, &json_path).unwrap();

    let csv_content = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv_content.starts_with("cluster,company,symbol"));
    assert_eq!(csv_content.lines().count(), 5, "header plus one row each");

    let payload: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(payload["points"].as_array().unwrap().len(), 4);
    assert_eq!(payload["centroids"].as_array().unwrap().len(), 2);
    assert!(payload["grid"]["labels"].as_array().unwrap().len() > 0);
}

//! Decision-boundary grid over the reduced 2D plane.
//!
//! Covers the min/max extent of the training points, padded by a small
//! margin, at a fixed step. Every grid point goes through the fitted
//! clusterer's `predict`; the flat label vector is reshaped to the grid's
//! row/column layout (rows = y ascending, columns = x ascending). No
//! fitting happens here; prediction is a pure function of fitted state,
//! so rows are labeled in parallel.

use crate::application::ml::KMeansFit;
use crate::domain::errors::{ClusterError, Result};
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

/// Mesh step of the label grid in reduced-space units.
pub const GRID_STEP: f64 = 0.01;
/// Padding added on every side of the training extent.
pub const GRID_MARGIN: f64 = 0.1;

/// Dense cluster-label surface with its spatial extent, ready for a
/// renderer to paint one color per label and overlay the points.
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryGrid {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub step: f64,
    pub n_rows: usize,
    pub n_cols: usize,
    /// Row-major labels, `n_rows * n_cols` entries; row 0 is `y_min`.
    pub labels: Vec<usize>,
}

impl BoundaryGrid {
    /// Label at grid cell (`row`, `col`).
    pub fn label_at(&self, row: usize, col: usize) -> usize {
        self.labels[row * self.n_cols + col]
    }

    /// Label of the grid cell nearest to the point `(x, y)`, if the point
    /// lies inside the grid extent.
    pub fn label_near(&self, x: f64, y: f64) -> Option<usize> {
        let col = ((x - self.x_min) / self.step).round() as isize;
        let row = ((y - self.y_min) / self.step).round() as isize;
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.n_rows || col >= self.n_cols {
            return None;
        }
        Some(self.label_at(row, col))
    }
}

/// Renders the label grid for the fitted clusterer over the extent of
/// `reduced` training coordinates (expected `entities x 2`).
pub fn render_boundary(reduced: &Array2<f64>, kmeans: &KMeansFit) -> Result<BoundaryGrid> {
    render_boundary_with(reduced, kmeans, GRID_STEP, GRID_MARGIN)
}

pub fn render_boundary_with(
    reduced: &Array2<f64>,
    kmeans: &KMeansFit,
    step: f64,
    margin: f64,
) -> Result<BoundaryGrid> {
    if reduced.ncols() != 2 {
        return Err(ClusterError::DimensionMismatch {
            expected: 2,
            found: reduced.ncols(),
        });
    }
    if reduced.nrows() == 0 {
        return Err(ClusterError::NoUsableData);
    }
    if !(step > 0.0) {
        return Err(ClusterError::InvalidParameter {
            name: "step",
            message: "grid step must be positive",
        });
    }

    let xs = reduced.column(0);
    let ys = reduced.column(1);
    let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min) - margin;
    let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max) + margin;
    let y_min = ys.iter().copied().fold(f64::INFINITY, f64::min) - margin;
    let y_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max) + margin;

    let n_cols = ((x_max - x_min) / step).floor() as usize + 1;
    let n_rows = ((y_max - y_min) / step).floor() as usize + 1;

    let labels: Vec<usize> = (0..n_rows)
        .into_par_iter()
        .flat_map_iter(|row| {
            let y = y_min + row as f64 * step;
            (0..n_cols).map(move |col| (x_min + col as f64 * step, y))
        })
        .map(|(x, y)| kmeans.predict_point(&[x, y]))
        .collect::<Result<Vec<usize>>>()?;

    Ok(BoundaryGrid {
        x_min,
        x_max,
        y_min,
        y_max,
        step,
        n_rows,
        n_cols,
        labels,
    })
}

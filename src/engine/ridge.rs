//! Standardized ridge regression, one independent fit per target column.

use std::collections::BTreeSet;

use anyhow::{bail, ensure, Result};

use crate::models::FeatureVector;

use super::model::{FittedModel, PreferenceModel};

const MIN_SCALE: f64 = 1e-9;
const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct RidgeModel {
    lambda: f64,
}

impl RidgeModel {
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda: if lambda.is_finite() && lambda > 0.0 {
                lambda
            } else {
                1.0
            },
        }
    }
}

impl Default for RidgeModel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Fitted state. Lives only in memory; a restart refits from stored feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeParameters {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
    intercepts: Vec<f64>,
    /// `weights[target][column]`
    weights: Vec<Vec<f64>>,
}

impl PreferenceModel for RidgeModel {
    fn name(&self) -> &str {
        "ridge"
    }

    fn train(
        &self,
        features: &[FeatureVector],
        targets: &[Vec<f64>],
    ) -> Result<Box<dyn FittedModel>> {
        ensure!(!features.is_empty(), "no training samples");
        ensure!(
            features.len() == targets.len(),
            "{} feature rows but {} target rows",
            features.len(),
            targets.len()
        );
        let width = targets[0].len();
        ensure!(width > 0, "targets are empty");
        if let Some(row) = targets.iter().position(|t| t.len() != width) {
            bail!("target row {row} has {} values, expected {width}", targets[row].len());
        }
        if targets.iter().flatten().any(|v| !v.is_finite()) {
            bail!("targets contain non-finite values");
        }

        let columns: Vec<String> = features
            .iter()
            .flat_map(|row| row.names().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        ensure!(!columns.is_empty(), "training features are empty");

        let rows = features.len();
        let dims = columns.len();

        // Column means over the rows that carry the column; absent cells are imputed with them.
        let means: Vec<f64> = columns
            .iter()
            .map(|col| {
                let present: Vec<f64> = features.iter().filter_map(|row| row.get(col)).collect();
                present.iter().sum::<f64>() / present.len() as f64
            })
            .collect();

        let raw: Vec<Vec<f64>> = features
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(&means)
                    .map(|(col, mean)| row.get(col).unwrap_or(*mean))
                    .collect()
            })
            .collect();

        let scales: Vec<f64> = (0..dims)
            .map(|j| {
                let variance = raw
                    .iter()
                    .map(|row| (row[j] - means[j]).powi(2))
                    .sum::<f64>()
                    / rows as f64;
                let std = variance.sqrt();
                if std < MIN_SCALE {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        let z: Vec<Vec<f64>> = raw
            .iter()
            .map(|row| {
                (0..dims)
                    .map(|j| (row[j] - means[j]) / scales[j])
                    .collect()
            })
            .collect();

        let mut gram = vec![vec![0.0; dims]; dims];
        for row in &z {
            for i in 0..dims {
                for j in 0..dims {
                    gram[i][j] += row[i] * row[j];
                }
            }
        }
        for (i, diag) in gram.iter_mut().enumerate() {
            diag[i] += self.lambda;
        }

        let mut intercepts = Vec::with_capacity(width);
        let mut weights = Vec::with_capacity(width);
        for t in 0..width {
            let y_mean = targets.iter().map(|row| row[t]).sum::<f64>() / rows as f64;
            let mut rhs = vec![0.0; dims];
            for (row, target) in z.iter().zip(targets) {
                let centered = target[t] - y_mean;
                for j in 0..dims {
                    rhs[j] += row[j] * centered;
                }
            }
            let w = solve(gram.clone(), rhs)?;
            intercepts.push(y_mean);
            weights.push(w);
        }

        if weights.iter().flatten().any(|w| !w.is_finite()) {
            bail!("fit produced non-finite weights");
        }

        Ok(Box::new(RidgeParameters {
            columns,
            means,
            scales,
            intercepts,
            weights,
        }))
    }
}

impl FittedModel for RidgeParameters {
    fn predict(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        ensure!(
            self.columns.iter().any(|col| features.contains(col)),
            "features share no columns with the training data"
        );

        let z: Vec<f64> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, col)| {
                let value = features.get(col).unwrap_or(self.means[j]);
                (value - self.means[j]) / self.scales[j]
            })
            .collect();

        Ok(self
            .intercepts
            .iter()
            .zip(&self.weights)
            .map(|(intercept, w)| intercept + w.iter().zip(&z).map(|(a, b)| a * b).sum::<f64>())
            .collect())
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPSILON {
            bail!("normal equations are singular");
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

//! Built-in supervised estimators and the small statistics toolkit the
//! models share.
//!
//! Estimators are black boxes to the rest of the engine: a classifier maps
//! feature rows to class probabilities, a regressor maps them to a value.
//! Both are deterministic and serialisable so fitted models can be saved.

pub mod ridge;
pub mod softmax;

use serde::{Deserialize, Serialize};

use crate::types::Result;

pub use ridge::RidgeRegression;
pub use softmax::SoftmaxRegression;

// ---------------------------------------------------------------------------
// Estimator contracts
// ---------------------------------------------------------------------------

pub trait Classifier {
    /// Fit on feature rows and integer class labels.
    fn fit(&mut self, x: &[Vec<f64>], labels: &[usize]) -> Result<()>;

    /// Classes seen at fit, ascending. Columns of `predict_proba` follow it.
    fn classes(&self) -> &[usize];

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}

pub trait Regressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierKind {
    Softmax(SoftmaxRegression),
}

impl Default for ClassifierKind {
    fn default() -> Self {
        ClassifierKind::Softmax(SoftmaxRegression::default())
    }
}

impl Classifier for ClassifierKind {
    fn fit(&mut self, x: &[Vec<f64>], labels: &[usize]) -> Result<()> {
        match self {
            ClassifierKind::Softmax(c) => c.fit(x, labels),
        }
    }

    fn classes(&self) -> &[usize] {
        match self {
            ClassifierKind::Softmax(c) => c.classes(),
        }
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        match self {
            ClassifierKind::Softmax(c) => c.predict_proba(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorKind {
    Ridge(RidgeRegression),
}

impl Default for RegressorKind {
    fn default() -> Self {
        RegressorKind::Ridge(RidgeRegression::default())
    }
}

impl Regressor for RegressorKind {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        match self {
            RegressorKind::Ridge(r) => r.fit(x, y),
        }
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            RegressorKind::Ridge(r) => r.predict(x),
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Mean of the non-NaN values, NaN when there are none.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Quantile `q` in [0, 1] with linear interpolation between order
/// statistics. NaN values are ignored; NaN for an empty input.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
pub(crate) fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
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
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
        assert!((quantile(&values, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&values, 0.9) - 3.7).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_ignores_nan() {
        assert_eq!(quantile(&[f64::NAN, 5.0], 0.3), 5.0);
        assert!(quantile(&[], 0.5).is_nan());
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_nan_mean() {
        assert_eq!(nan_mean([1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean([f64::NAN]).is_nan());
    }

    #[test]
    fn test_solve_linear_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
        assert!(solve(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).is_none());
    }
}

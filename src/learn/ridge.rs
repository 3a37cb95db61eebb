//! Ridge regression solved in closed form on centred data.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{solve, Regressor};
use crate::types::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    #[serde(default)]
    coefficients: Vec<f64>,
    #[serde(default)]
    intercept: f64,
    #[serde(default)]
    fitted: bool,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self { alpha: 1.0, coefficients: Vec::new(), intercept: 0.0, fitted: false }
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, ..Self::default() }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.len() != y.len() || x.is_empty() {
            return Err(EngineError::Configuration(format!(
                "cannot fit ridge regression on {} rows and {} targets",
                x.len(),
                y.len()
            )));
        }
        let n = x.len() as f64;
        let width = x[0].len();
        let x_mean: Vec<f64> = (0..width).map(|j| x.iter().map(|r| r[j]).sum::<f64>() / n).collect();
        let y_mean = y.iter().sum::<f64>() / n;

        let mut gram = vec![vec![0.0; width]; width];
        let mut moment = vec![0.0; width];
        for (row, target) in x.iter().zip(y) {
            let centred: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            for i in 0..width {
                moment[i] += centred[i] * (target - y_mean);
                for j in 0..width {
                    gram[i][j] += centred[i] * centred[j];
                }
            }
        }
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += self.alpha;
        }
        let coefficients = solve(gram, moment)
            .ok_or_else(|| EngineError::Configuration("ridge system is singular; raise alpha".into()))?;
        self.intercept = y_mean - coefficients.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
        self.coefficients = coefficients;
        self.fitted = true;
        debug!(features = width, rows = x.len(), "Ridge regression fitted");
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(EngineError::NotFitted("ridge regression".into()));
        }
        Ok(x.iter()
            .map(|row| self.intercept + row.iter().zip(&self.coefficients).map(|(v, c)| v * c).sum::<f64>())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_linear_relation() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| 1.0 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let mut model = RidgeRegression::new(1e-9);
        model.fit(&x, &y).unwrap();
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-6);
        assert!((model.coefficients()[1] + 0.5).abs() < 1e-6);
        assert!((model.intercept() - 1.0).abs() < 1e-6);

        let pred = model.predict(&[vec![10.0, 1.0]]).unwrap();
        assert!((pred[0] - 20.5).abs() < 1e-6);
    }

    #[test]
    fn test_penalty_shrinks_coefficients() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let mut loose = RidgeRegression::new(0.0);
        let mut tight = RidgeRegression::new(100.0);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();
        assert!(tight.coefficients()[0] < loose.coefficients()[0]);
    }

    #[test]
    fn test_unfitted_rejects_prediction() {
        assert!(RidgeRegression::default().predict(&[vec![1.0]]).is_err());
    }
}

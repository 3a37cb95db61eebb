//! Multinomial logistic regression fitted by full-batch gradient descent.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Classifier;
use crate::types::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    /// L2 penalty on the weights (not the intercepts).
    pub l2: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this.
    pub tolerance: f64,
    #[serde(default)]
    classes: Vec<usize>,
    /// One row per class: intercept followed by feature weights.
    #[serde(default)]
    weights: Vec<Vec<f64>>,
}

impl Default for SoftmaxRegression {
    fn default() -> Self {
        Self {
            l2: 1e-3,
            learning_rate: 0.5,
            max_iter: 500,
            tolerance: 1e-6,
            classes: Vec::new(),
            weights: Vec::new(),
        }
    }
}

impl SoftmaxRegression {
    fn scores(&self, row: &[f64]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .map(|w| w[0] + w[1..].iter().zip(row).map(|(a, b)| a * b).sum::<f64>())
            .collect();
        softmax(&logits)
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.iter().map(|e| e / total).collect()
}

impl Classifier for SoftmaxRegression {
    fn fit(&mut self, x: &[Vec<f64>], labels: &[usize]) -> Result<()> {
        if x.len() != labels.len() {
            return Err(EngineError::Configuration(format!(
                "{} feature rows for {} labels",
                x.len(),
                labels.len()
            )));
        }
        if x.is_empty() {
            return Err(EngineError::Configuration("cannot fit a classifier on no rows".into()));
        }
        let mut classes = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let width = x[0].len();
        let n = x.len() as f64;
        self.classes = classes;
        self.weights = vec![vec![0.0; width + 1]; self.classes.len()];

        let targets: Vec<usize> = labels
            .iter()
            .map(|l| self.classes.iter().position(|c| c == l).unwrap_or(0))
            .collect();

        let mut iterations = 0;
        for _ in 0..self.max_iter {
            iterations += 1;
            let mut gradient = vec![vec![0.0; width + 1]; self.classes.len()];
            for (row, &target) in x.iter().zip(&targets) {
                let p = self.scores(row);
                for (k, g) in gradient.iter_mut().enumerate() {
                    let err = p[k] - if k == target { 1.0 } else { 0.0 };
                    g[0] += err;
                    for (gj, xj) in g[1..].iter_mut().zip(row) {
                        *gj += err * xj;
                    }
                }
            }
            let mut largest: f64 = 0.0;
            for (g, w) in gradient.iter_mut().zip(&self.weights) {
                for (j, gj) in g.iter_mut().enumerate() {
                    *gj /= n;
                    if j > 0 {
                        *gj += self.l2 * w[j];
                    }
                    largest = largest.max(gj.abs());
                }
            }
            for (w, g) in self.weights.iter_mut().zip(&gradient) {
                for (wj, gj) in w.iter_mut().zip(g) {
                    *wj -= self.learning_rate * gj;
                }
            }
            if largest < self.tolerance {
                break;
            }
        }
        debug!(classes = self.classes.len(), features = width, iterations, "Softmax regression fitted");
        Ok(())
    }

    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if self.weights.is_empty() {
            return Err(EngineError::NotFitted("softmax regression".into()));
        }
        Ok(x.iter().map(|row| self.scores(row)).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separable_classes() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 / 10.0 - 1.5]).collect();
        let labels: Vec<usize> = (0..30).map(|i| if i < 15 { 0 } else { 2 }).collect();
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &labels).unwrap();
        assert_eq!(model.classes(), &[0, 2]);

        let proba = model.predict_proba(&[vec![-1.5], vec![1.5]]).unwrap();
        assert!(proba[0][0] > 0.8);
        assert!(proba[1][1] > 0.8);
        for p in &proba {
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let labels = vec![0, 1, 2];
        let mut a = SoftmaxRegression::default();
        let mut b = SoftmaxRegression::default();
        a.fit(&x, &labels).unwrap();
        b.fit(&x, &labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unfitted_rejects_prediction() {
        let model = SoftmaxRegression::default();
        assert!(matches!(model.predict_proba(&[vec![0.0]]), Err(EngineError::NotFitted(_))));
    }
}

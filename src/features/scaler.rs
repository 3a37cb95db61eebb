//! Column standardisation to zero mean and unit variance.

use serde::{Deserialize, Serialize};

use super::Matrix;
use crate::types::{EngineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    mean: Vec<f64>,
    #[serde(default)]
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(&mut self, matrix: &Matrix) {
        let n = matrix.len().max(1) as f64;
        let width = matrix.width();
        self.mean = (0..width)
            .map(|j| matrix.rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        self.scale = (0..width)
            .map(|j| {
                let var = matrix.rows.iter().map(|r| (r[j] - self.mean[j]).powi(2)).sum::<f64>() / n;
                // constant columns are only centred
                if var > 0.0 { var.sqrt() } else { 1.0 }
            })
            .collect();
    }

    pub fn transform(&self, mut matrix: Matrix) -> Result<Matrix> {
        if matrix.width() != self.mean.len() {
            return Err(EngineError::Configuration(format!(
                "scaler fitted on {} columns, got {}",
                self.mean.len(),
                matrix.width()
            )));
        }
        for row in &mut matrix.rows {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (*v - self.mean[j]) / self.scale[j];
            }
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardises_columns() {
        let m = Matrix::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 5.0], vec![3.0, 5.0]],
        );
        let mut scaler = StandardScaler::default();
        scaler.fit(&m);
        let out = scaler.transform(m).unwrap();
        assert_eq!(out.rows, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::default();
        scaler.fit(&Matrix::new(vec!["a".into()], vec![vec![1.0]]));
        assert!(scaler.transform(Matrix::new(vec![], vec![vec![]])).is_err());
    }
}

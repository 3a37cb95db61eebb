use serde::{Deserialize, Serialize};

use super::{Features, Matrix};
use crate::learn::nan_mean;
use crate::table::Table;
use crate::types::{Outcome, Result};

/// Odds-probability convolution per outcome; missing values are filled
/// with the fit-time mean of the same outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpcFeatures {
    pub accuracy_factor: f64,
    #[serde(default)]
    means: Vec<(Outcome, f64)>,
}

impl Default for OpcFeatures {
    fn default() -> Self {
        Self { accuracy_factor: 1.0, means: Vec::new() }
    }
}

impl OpcFeatures {
    pub fn new(accuracy_factor: f64) -> Self {
        Self { accuracy_factor, means: Vec::new() }
    }
}

impl Features for OpcFeatures {
    fn fit(&mut self, table: &Table) -> Result<()> {
        let opc = table.prediction()?.odds_probability_convolution(self.accuracy_factor)?;
        self.means = opc
            .into_iter()
            .map(|(o, values)| {
                let mean = nan_mean(values);
                (o, if mean.is_nan() { 0.0 } else { mean })
            })
            .collect();
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<Matrix> {
        let opc = table.prediction()?.odds_probability_convolution(self.accuracy_factor)?;
        let columns = self
            .means
            .iter()
            .map(|(outcome, mean)| {
                let values = match opc.iter().find(|(o, _)| o == outcome) {
                    Some((_, v)) => v.iter().map(|x| if x.is_nan() { *mean } else { *x }).collect(),
                    None => vec![*mean; table.len()],
                };
                (format!("opc.{outcome}"), values)
            })
            .collect();
        Ok(Matrix::from_columns(columns, table.len()))
    }
}

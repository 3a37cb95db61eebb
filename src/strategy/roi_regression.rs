//! Bettor that regresses realised ROI on features plus the candidate
//! outcome, then bets the top `bet_rate` share of the scored batch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{bet_table, Better};
use crate::features::{FeaturePipeline, Features, Matrix};
use crate::learn::{quantile, Regressor, RegressorKind};
use crate::predict::{Predictor, PredictorKind};
use crate::table::{mask_indices, ColumnData, Table};
use crate::types::{EngineError, Outcome, Result, OUTCOMES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiRegressionBetter {
    pub bet_rate: f64,
    pub features: FeaturePipeline,
    pub regressor: RegressorKind,
    pub outcomes: Vec<Outcome>,
    pub predictor: Option<Box<PredictorKind>>,
}

impl Default for RoiRegressionBetter {
    fn default() -> Self {
        Self {
            bet_rate: 0.03,
            features: FeaturePipeline::default(),
            regressor: RegressorKind::default(),
            outcomes: OUTCOMES.to_vec(),
            predictor: None,
        }
    }
}

impl RoiRegressionBetter {
    pub fn new(features: FeaturePipeline, regressor: RegressorKind) -> Self {
        Self { features, regressor, ..Self::default() }
    }

    /// Configured outcomes the table has odds for.
    fn candidates(&self, table: &Table) -> Result<Vec<Outcome>> {
        let odds = table.odds()?;
        Ok(self.outcomes.iter().copied().filter(|o| odds.contains(o.code())).collect())
    }

    /// One row per (row, candidate) pair, row-major, with `bet.outcome` set.
    fn explode(table: &Table, candidates: &[Outcome]) -> Result<Table> {
        let k = candidates.len();
        let indices: Vec<usize> = (0..table.len() * k).map(|i| i / k).collect();
        let mut exploded = table.select_rows(&indices);
        let codes = (0..indices.len()).map(|i| Some(candidates[i % k].code().to_string())).collect();
        exploded.set_namespaced("bet", "outcome", ColumnData::Text(codes))?;
        Ok(exploded)
    }

    /// Pipeline features followed by a one-hot of the candidate outcome.
    fn design(&self, exploded: &Table) -> Result<Matrix> {
        let chosen = exploded.bet()?.outcomes()?;
        let columns = self
            .outcomes
            .iter()
            .map(|o| {
                let hot = chosen.iter().map(|c| if *c == Some(*o) { 1.0 } else { 0.0 }).collect();
                (format!("bet.outcome={o}"), hot)
            })
            .collect();
        let onehot = Matrix::from_columns(columns, exploded.len());
        self.features.transform(exploded)?.hstack(onehot)
    }

    fn with_predictions(&self, table: &Table) -> Result<Table> {
        let mut copy = table.clone();
        if let Some(predictor) = &self.predictor {
            predictor.predict_inplace(&mut copy)?;
        }
        Ok(copy)
    }
}

impl Better for RoiRegressionBetter {
    fn fit(&mut self, table: &Table) -> Result<()> {
        if let Some(predictor) = self.predictor.as_mut() {
            predictor.fit(table)?;
        }
        let working = self.with_predictions(table)?;
        let population = working.odds()?.drop_missing()?;
        let candidates = self.candidates(&population)?;
        let exploded = Self::explode(&population, &candidates)?;
        let roi = exploded.bet()?.roi()?;
        let resolved: Vec<bool> = roi.iter().map(|r| !r.is_nan()).collect();
        let exploded = exploded.filter(&resolved);
        let y: Vec<f64> = mask_indices(&resolved).into_iter().map(|i| roi[i]).collect();
        if y.is_empty() {
            return Err(EngineError::Configuration(
                "no odds-complete, resolved matches to regress ROI on".into(),
            ));
        }

        self.features.fit(&exploded)?;
        let x = self.design(&exploded)?;
        self.regressor.fit(&x.rows, &y)?;
        debug!(rows = x.len(), features = x.width(), "ROI regression better fitted");
        Ok(())
    }

    fn bet(&self, table: &Table) -> Result<Table> {
        let working = self.with_predictions(table)?;
        let candidates = self.candidates(&working)?;
        if candidates.is_empty() {
            return bet_table(table, &vec![None; table.len()], vec![f64::NAN; table.len()]);
        }
        let exploded = Self::explode(&working, &candidates)?;
        let x = self.design(&exploded)?;
        let predicted = self.regressor.predict(&x.rows)?;

        let best: Vec<(Outcome, f64)> = predicted
            .chunks(candidates.len())
            .map(|chunk| {
                let mut j = 0;
                for (k, v) in chunk.iter().enumerate() {
                    if *v > chunk[j] {
                        j = k;
                    }
                }
                (candidates[j], chunk[j])
            })
            .collect();
        let values: Vec<f64> = best.iter().map(|(_, v)| *v).collect();
        let threshold = quantile(&values, 1.0 - self.bet_rate);

        let (outcomes, expediency): (Vec<_>, Vec<_>) = best
            .into_iter()
            .map(|(o, v)| if v >= threshold { (Some(o), 0.5) } else { (None, f64::NAN) })
            .unzip();
        bet_table(table, &outcomes, expediency)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

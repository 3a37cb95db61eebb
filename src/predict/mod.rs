//! Outcome predictors: estimate single-outcome probabilities per row.

pub mod odds;
pub mod pipeline;

use serde::{Deserialize, Serialize};

use crate::table::namespace::Prediction;
use crate::table::{Column, ColumnData, Table};
use crate::types::{Result, SINGLE_OUTCOMES};

pub use odds::OddsPredictor;
pub use pipeline::PipelinePredictor;

pub trait Predictor {
    fn fit(&mut self, _table: &Table) -> Result<()> {
        Ok(())
    }

    /// Probabilities for `1`, `X`, `2` as a table keyed like `table`.
    fn predict(&self, table: &Table) -> Result<Table>;

    /// Write the probabilities under `prediction.*`.
    fn predict_inplace(&self, table: &mut Table) -> Result<()> {
        let prediction = self.predict(table)?;
        table.assign::<Prediction>(prediction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictorKind {
    Odds(OddsPredictor),
    Pipeline(PipelinePredictor),
}

impl Predictor for PredictorKind {
    fn fit(&mut self, table: &Table) -> Result<()> {
        match self {
            PredictorKind::Odds(p) => p.fit(table),
            PredictorKind::Pipeline(p) => p.fit(table),
        }
    }

    fn predict(&self, table: &Table) -> Result<Table> {
        match self {
            PredictorKind::Odds(p) => p.predict(table),
            PredictorKind::Pipeline(p) => p.predict(table),
        }
    }
}

/// Probability sub-table (`1`, `X`, `2`) sharing `table`'s index.
pub(crate) fn prediction_table(table: &Table, probabilities: [Vec<f64>; 3]) -> Result<Table> {
    let mut out = Table::new(table.index().to_vec());
    out.meta = table.meta.clone();
    for (outcome, values) in SINGLE_OUTCOMES.iter().zip(probabilities) {
        out.set_column(Column::new(outcome.code(), ColumnData::Float(values)))?;
    }
    Ok(out)
}

use serde::{Deserialize, Serialize};

use super::{prediction_table, Predictor};
use crate::table::Table;
use crate::types::Result;

/// Bookmaker-implied probabilities: normalised `1 / (odds - 1)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsPredictor {}

impl Predictor for OddsPredictor {
    fn predict(&self, table: &Table) -> Result<Table> {
        prediction_table(table, table.odds()?.implied_prediction()?)
    }
}

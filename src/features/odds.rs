use serde::{Deserialize, Serialize};

use super::{Features, Matrix};
use crate::table::Table;
use crate::types::{Outcome, Result, SINGLE_OUTCOMES};

/// Raw (or reciprocal) odds per outcome. Missing odds read as 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsFeatures {
    #[serde(default)]
    pub reversed: bool,
    pub outcomes: Vec<Outcome>,
}

impl Default for OddsFeatures {
    fn default() -> Self {
        Self { reversed: false, outcomes: SINGLE_OUTCOMES.to_vec() }
    }
}

impl Features for OddsFeatures {
    fn transform(&self, table: &Table) -> Result<Matrix> {
        let odds = table.odds()?;
        let columns = self
            .outcomes
            .iter()
            .map(|outcome| {
                let values = odds
                    .values(*outcome)
                    .into_iter()
                    .map(|v| if v.is_nan() { 1.0 } else { v })
                    .map(|v| if self.reversed { 1.0 / v } else { v })
                    .collect();
                (format!("odds.{outcome}"), values)
            })
            .collect();
        Ok(Matrix::from_columns(columns, table.len()))
    }
}

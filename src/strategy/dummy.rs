use serde::{Deserialize, Serialize};

use super::{bet_table, Better};
use crate::table::Table;
use crate::types::{Outcome, Result};

/// Baseline that bets the same outcome on every row at expediency 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyBetter {
    pub outcome: Outcome,
}

impl Default for DummyBetter {
    fn default() -> Self {
        Self { outcome: Outcome::Home }
    }
}

impl DummyBetter {
    pub fn new(outcome: Outcome) -> Self {
        Self { outcome }
    }
}

impl Better for DummyBetter {
    fn bet(&self, table: &Table) -> Result<Table> {
        let outcomes = vec![Some(self.outcome); table.len()];
        bet_table(table, &outcomes, vec![0.5; table.len()])
    }
}

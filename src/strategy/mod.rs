//! Bettors: pick an outcome per row (or abstain) and score how expedient
//! the bet is.
//!
//! Output columns, written under `bet.*`:
//! - `outcome`: one of the six outcome codes, or `0` for an abstention.
//! - `expediency`: conviction in [0, 1]; NaN for abstentions.

pub mod calibration;
pub mod dummy;
pub mod opc;
pub mod roi_regression;

use serde::{Deserialize, Serialize};

use crate::table::namespace::Bet;
use crate::table::{Column, ColumnData, Table};
use crate::types::{optional_code, Outcome, Result};

pub use dummy::DummyBetter;
pub use opc::OpcBetter;
pub use roi_regression::RoiRegressionBetter;

pub trait Better {
    fn fit(&mut self, _table: &Table) -> Result<()> {
        Ok(())
    }

    /// Outcome and expediency as a table keyed like `table`.
    fn bet(&self, table: &Table) -> Result<Table>;

    /// Write the decision under `bet.*`.
    fn bet_inplace(&self, table: &mut Table) -> Result<()> {
        let bets = self.bet(table)?;
        table.assign::<Bet>(bets)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BetterKind {
    Dummy(DummyBetter),
    Opc(OpcBetter),
    RoiRegression(RoiRegressionBetter),
}

impl Better for BetterKind {
    fn fit(&mut self, table: &Table) -> Result<()> {
        match self {
            BetterKind::Dummy(b) => b.fit(table),
            BetterKind::Opc(b) => b.fit(table),
            BetterKind::RoiRegression(b) => b.fit(table),
        }
    }

    fn bet(&self, table: &Table) -> Result<Table> {
        match self {
            BetterKind::Dummy(b) => b.bet(table),
            BetterKind::Opc(b) => b.bet(table),
            BetterKind::RoiRegression(b) => b.bet(table),
        }
    }

    fn bet_inplace(&self, table: &mut Table) -> Result<()> {
        match self {
            BetterKind::Dummy(b) => b.bet_inplace(table),
            BetterKind::Opc(b) => b.bet_inplace(table),
            BetterKind::RoiRegression(b) => b.bet_inplace(table),
        }
    }
}

/// Decision sub-table (`outcome`, `expediency`) sharing `table`'s index.
pub(crate) fn bet_table(table: &Table, outcomes: &[Option<Outcome>], expediency: Vec<f64>) -> Result<Table> {
    let mut out = Table::new(table.index().to_vec());
    out.meta = table.meta.clone();
    let codes = outcomes.iter().map(|o| Some(optional_code(*o).to_string())).collect();
    out.set_column(Column::new("outcome", ColumnData::Text(codes)))?;
    out.set_column(Column::new("expediency", ColumnData::Float(expediency)))?;
    Ok(out)
}

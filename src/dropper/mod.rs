//! Droppers: row filters learned on a training population and projected
//! onto other tables.

pub mod league;
pub mod no_odds;
pub mod prediction_advantage;
pub mod rare_team;

use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::types::Result;

pub use league::LeagueDropper;
pub use no_odds::NoOddsDropper;
pub use prediction_advantage::LowPredictionAdvantageLeagueDropper;
pub use rare_team::RareTeamDropper;

pub trait Dropper {
    fn fit(&mut self, _table: &Table) -> Result<()> {
        Ok(())
    }

    /// Copy of `table` without the dropped rows.
    fn drop_rows(&self, table: &Table) -> Result<Table>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropperKind {
    League(LeagueDropper),
    RareTeam(RareTeamDropper),
    NoOdds(NoOddsDropper),
    LowPredictionAdvantageLeague(LowPredictionAdvantageLeagueDropper),
}

impl Dropper for DropperKind {
    fn fit(&mut self, table: &Table) -> Result<()> {
        match self {
            DropperKind::League(d) => d.fit(table),
            DropperKind::RareTeam(d) => d.fit(table),
            DropperKind::NoOdds(d) => d.fit(table),
            DropperKind::LowPredictionAdvantageLeague(d) => d.fit(table),
        }
    }

    fn drop_rows(&self, table: &Table) -> Result<Table> {
        match self {
            DropperKind::League(d) => d.drop_rows(table),
            DropperKind::RareTeam(d) => d.drop_rows(table),
            DropperKind::NoOdds(d) => d.drop_rows(table),
            DropperKind::LowPredictionAdvantageLeague(d) => d.drop_rows(table),
        }
    }
}

/// `(sport, league)` of every row.
pub(crate) fn league_keys(table: &Table) -> Result<Vec<(String, String)>> {
    let sports = table.texts("match.sport")?;
    let leagues = table.texts("match.league")?;
    Ok(sports
        .iter()
        .zip(leagues)
        .map(|(s, l)| (s.clone().unwrap_or_default(), l.clone().unwrap_or_default()))
        .collect())
}

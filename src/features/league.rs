use serde::{Deserialize, Serialize};

use super::{Features, Matrix};
use crate::table::Table;
use crate::types::Result;

/// One-hot encoding of `(sport, league)` pairs seen at fit. Unseen leagues
/// encode as all zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueFeatures {
    #[serde(default)]
    leagues: Vec<(String, String)>,
}

fn league_keys(table: &Table) -> Result<Vec<(String, String)>> {
    let sport = table.texts("match.sport")?;
    let league = table.texts("match.league")?;
    Ok(sport
        .iter()
        .zip(league)
        .map(|(s, l)| (s.clone().unwrap_or_default(), l.clone().unwrap_or_default()))
        .collect())
}

impl Features for LeagueFeatures {
    fn fit(&mut self, table: &Table) -> Result<()> {
        let mut leagues = league_keys(table)?;
        leagues.sort();
        leagues.dedup();
        self.leagues = leagues;
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<Matrix> {
        let keys = league_keys(table)?;
        let names = self.leagues.iter().map(|(s, l)| format!("league={s}/{l}")).collect();
        let rows = keys
            .iter()
            .map(|key| self.leagues.iter().map(|l| if l == key { 1.0 } else { 0.0 }).collect())
            .collect();
        Ok(Matrix::new(names, rows))
    }
}

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{league_keys, Dropper};
use crate::table::Table;
use crate::types::{EngineError, Result};

/// Keep leagues where stored predictions beat the bookmaker favourite by at
/// least `threshold` accuracy.
///
/// The favourite's accuracy is measured on odds-complete rows only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LowPredictionAdvantageLeagueDropper {
    pub threshold: f64,
    #[serde(default)]
    leagues: Option<Vec<(String, String)>>,
}

impl LowPredictionAdvantageLeagueDropper {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, leagues: None }
    }

    pub fn leagues(&self) -> Option<&[(String, String)]> {
        self.leagues.as_deref()
    }
}

impl Dropper for LowPredictionAdvantageLeagueDropper {
    fn fit(&mut self, table: &Table) -> Result<()> {
        let keys = league_keys(table)?;
        let mut distinct = keys.clone();
        distinct.sort();
        distinct.dedup();

        let mut kept = Vec::new();
        for league in distinct {
            let mask: Vec<bool> = keys.iter().map(|k| *k == league).collect();
            let rows = table.filter(&mask);
            let advantage = rows.prediction()?.accuracy()? - rows.odds()?.accuracy()?;
            debug!(sport = %league.0, league = %league.1, advantage, "League prediction advantage");
            if advantage >= self.threshold {
                kept.push(league);
            }
        }
        self.leagues = Some(kept);
        Ok(())
    }

    fn drop_rows(&self, table: &Table) -> Result<Table> {
        let leagues = self.leagues.as_ref().ok_or_else(|| {
            EngineError::NotFitted("prediction advantage dropper has no league list".into())
        })?;
        let keep: Vec<bool> = league_keys(table)?.iter().map(|k| leagues.binary_search(k).is_ok()).collect();
        Ok(table.retain(&keep))
    }
}

use serde::{Deserialize, Serialize};

use super::{league_keys, Dropper};
use crate::table::Table;
use crate::types::Result;

/// Keep only the allowed `(sport, league)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueDropper {
    pub leagues: Vec<(String, String)>,
}

impl LeagueDropper {
    pub fn new<S: Into<String>>(leagues: impl IntoIterator<Item = (S, S)>) -> Self {
        Self { leagues: leagues.into_iter().map(|(s, l)| (s.into(), l.into())).collect() }
    }
}

impl Dropper for LeagueDropper {
    fn drop_rows(&self, table: &Table) -> Result<Table> {
        let keep: Vec<bool> = league_keys(table)?.iter().map(|k| self.leagues.contains(k)).collect();
        Ok(table.retain(&keep))
    }
}

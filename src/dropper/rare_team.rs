use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Dropper;
use crate::table::Table;
use crate::types::{EngineError, Result};

/// Keep matches whose two teams both played at least `min_matches` times
/// in the fitted table, at either venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RareTeamDropper {
    pub min_matches: usize,
    /// `(country, team)` pairs that passed at fit, sorted.
    #[serde(default)]
    teams: Option<Vec<(String, String)>>,
}

impl Default for RareTeamDropper {
    fn default() -> Self {
        Self::new(30)
    }
}

impl RareTeamDropper {
    pub fn new(min_matches: usize) -> Self {
        Self { min_matches, teams: None }
    }
}

/// Home and away `(country, team)` of every row.
fn venues(table: &Table) -> Result<Vec<[(String, String); 2]>> {
    let text = |name: &str| -> Result<Vec<String>> {
        Ok(table.texts(name)?.iter().map(|v| v.clone().unwrap_or_default()).collect())
    };
    let (hc, ht) = (text("match.home_country")?, text("match.home_team")?);
    let (ac, at) = (text("match.away_country")?, text("match.away_team")?);
    Ok((0..table.len())
        .map(|i| [(hc[i].clone(), ht[i].clone()), (ac[i].clone(), at[i].clone())])
        .collect())
}

impl Dropper for RareTeamDropper {
    fn fit(&mut self, table: &Table) -> Result<()> {
        // One row per bookmaker: count each match once.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut counts: HashMap<(String, String), usize> = HashMap::new();
        for (key, pair) in table.index().iter().zip(venues(table)?) {
            if !seen.insert(key.match_id.as_str()) {
                continue;
            }
            for team in pair {
                *counts.entry(team).or_default() += 1;
            }
        }
        let mut teams: Vec<(String, String)> = counts
            .into_iter()
            .filter(|(_, n)| *n >= self.min_matches)
            .map(|(team, _)| team)
            .collect();
        teams.sort();
        debug!(teams = teams.len(), min_matches = self.min_matches, "Rare team dropper fitted");
        self.teams = Some(teams);
        Ok(())
    }

    fn drop_rows(&self, table: &Table) -> Result<Table> {
        let teams = self
            .teams
            .as_ref()
            .ok_or_else(|| EngineError::NotFitted("rare team dropper has no team counts".into()))?;
        let keep: Vec<bool> = venues(table)?
            .iter()
            .map(|pair| pair.iter().all(|team| teams.binary_search(team).is_ok()))
            .collect();
        Ok(table.retain(&keep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::record;

    #[test]
    fn test_counts_both_venues() {
        let t = Table::from_records(&[
            record("m1", 0, 1, 0).teams("Arsenal", "Chelsea"),
            record("m2", 1, 1, 0).teams("Chelsea", "Arsenal"),
            record("m3", 2, 1, 0).teams("Arsenal", "Fulham"),
        ]);
        let mut dropper = RareTeamDropper::new(2);
        dropper.fit(&t).unwrap();
        let kept = dropper.drop_rows(&t).unwrap();
        assert_eq!(kept.len(), 2);
        assert!((kept.meta.representativeness - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_counts_matches_not_bookmaker_rows() {
        let t = Table::from_records(&[
            record("m1", 0, 1, 0).teams("Arsenal", "Chelsea"),
            record("m1", 0, 1, 0).teams("Arsenal", "Chelsea").bookmaker("Pinnacle"),
            record("m1", 0, 1, 0).teams("Arsenal", "Chelsea").bookmaker("Marathon"),
        ]);
        let mut dropper = RareTeamDropper::new(2);
        dropper.fit(&t).unwrap();
        assert_eq!(dropper.drop_rows(&t).unwrap().len(), 0);

        let mut dropper = RareTeamDropper::new(1);
        dropper.fit(&t).unwrap();
        assert_eq!(dropper.drop_rows(&t).unwrap().len(), 3);
    }

    #[test]
    fn test_drop_before_fit() {
        let t = Table::from_records(&[record("m1", 0, 1, 0)]);
        assert!(RareTeamDropper::default().drop_rows(&t).is_err());
    }
}
